use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, bail};
use silhouette::{Pipeline, SilhouetteConfig, normalize_tree};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use token_cli::{BatchConfig, run_batch};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a tree of artwork into canonical silhouette PNGs
    Normalize {
        /// Directory searched recursively for images
        #[arg(short, long)]
        input_dir: PathBuf,
        /// Root of the mirrored output tree
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Comma-separated image extensions to pick up
        #[arg(long, value_delimiter = ',', default_value = "webp")]
        ext: Vec<String>,
        /// Pixels with alpha at or below this value are background
        #[arg(long, default_value_t = silhouette::DEFAULT_ALPHA_THRESHOLD)]
        alpha_threshold: u8,
        /// Pixels with red, green and blue all above this value are background
        #[arg(long, default_value_t = silhouette::DEFAULT_WHITE_THRESHOLD)]
        white_threshold: u8,
        /// Border added around the cropped content, in pixels
        #[arg(long, default_value_t = 0)]
        padding: u32,
    },
    /// Generate token meshes from a batch configuration file
    Generate {
        /// Path to the TOML or JSON batch configuration
        #[arg(short, long)]
        config: PathBuf,
        /// Tokens built in parallel (defaults to the number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Print the JSON schema of the batch configuration
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Normalize {
            input_dir,
            output_dir,
            ext,
            alpha_threshold,
            white_threshold,
            padding,
        } => {
            let config = SilhouetteConfig {
                alpha_threshold: *alpha_threshold,
                white_threshold: *white_threshold,
                padding_px: *padding,
            };
            normalize_images(input_dir, output_dir, ext, config)?;
        }
        Commands::Generate { config, jobs } => {
            let jobs = (*jobs).unwrap_or_else(|| {
                std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
            });
            generate_tokens(config, jobs).await?;
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(BatchConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn normalize_images(
    input_dir: &Path,
    output_dir: &Path,
    extensions: &[String],
    config: SilhouetteConfig,
) -> Result<()> {
    let pipeline = Pipeline::builder().with_config(config).build();
    info!("Normalizing {} with {}", input_dir.display(), pipeline.info());

    let report = normalize_tree(&pipeline, input_dir, output_dir, extensions)?;
    info!("Converted {} images into {}", report.converted.len(), output_dir.display());

    if !report.failed.is_empty() {
        for (path, reason) in &report.failed {
            warn!("Not converted: {} ({})", path.display(), reason);
        }
        bail!("{} images could not be normalized", report.failed.len());
    }
    Ok(())
}

async fn generate_tokens(config_path: &Path, jobs: usize) -> Result<()> {
    let config = Arc::new(BatchConfig::from_file(config_path)?);
    let total = config.tokens.len();
    info!(
        "Generating {} tokens into {} ({} parallel jobs)",
        total,
        config.output_dir.display(),
        jobs
    );

    let report = run_batch(config, jobs, BatchConfig::generate).await?;
    if !report.failed.is_empty() {
        bail!("{} of {} tokens failed", report.failed.len(), total);
    }
    info!("All {} tokens generated", report.generated.len());
    Ok(())
}
