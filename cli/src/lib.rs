use silhouette::{CanonicalImage, Pipeline, SilhouetteConfig, SilhouetteError, load_canonical, load_rgba};
use solid::{
    MeshFormat, SolidError, TokenConfig, assemble_token_from_contours, output_file_name, rim_layout,
    save_mesh,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum TokenCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Silhouette(#[from] SilhouetteError),
    #[error(transparent)]
    Solid(#[from] SolidError),
    #[error("Batch configuration lists no tokens")]
    EmptyTokenList,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
    #[error("More than one token is written to {0}")]
    DuplicateOutput(String),
    #[error(transparent)]
    Scheduler(#[from] AcquireError),
}

/// How the token images on disk should be read
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Already normalized silhouettes (any non-black pixel is foreground)
    #[default]
    Canonical,
    /// Raw artwork, segmented and normalized before extrusion
    Raw,
}

/// One token to generate
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TokenEntry {
    /// One or two words; also used for the output file name
    pub name: String,
    pub image: PathBuf,
}

/// Batch token generation settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: MeshFormat,
    #[serde(default)]
    pub images: ImageKind,
    #[serde(default)]
    pub silhouette: SilhouetteConfig,
    #[serde(default)]
    pub token: TokenConfig,
    pub tokens: Vec<TokenEntry>,
}

impl BatchConfig {
    /// Load BatchConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load BatchConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, TokenCliError> {
        let config: BatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load BatchConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load BatchConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, TokenCliError> {
        let config: BatchConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration. Relative paths are
    /// resolved against the directory holding the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TokenCliError> {
        let path_ref = path.as_ref();
        let config = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path_ref)?,
            Some("json") => Self::from_json_file(path_ref)?,
            _ => return Err(TokenCliError::UnsupportedFileFormat),
        };
        let base = path_ref.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    pub fn validate(&self) -> Result<(), TokenCliError> {
        if self.tokens.is_empty() {
            return Err(TokenCliError::EmptyTokenList);
        }
        let mut outputs = HashSet::new();
        for entry in &self.tokens {
            rim_layout(&entry.name)?;
            let file = output_file_name(&entry.name, self.format);
            if !outputs.insert(file.clone()) {
                return Err(TokenCliError::DuplicateOutput(file));
            }
        }
        self.token.validate()?;
        Ok(())
    }

    fn relative_to(mut self, base: &Path) -> Self {
        self.output_dir = base.join(&self.output_dir);
        self.token.font = self.token.font.map(|font| base.join(font));
        for entry in &mut self.tokens {
            entry.image = base.join(&entry.image);
        }
        self
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::builder().with_config(self.silhouette).build()
    }

    /// Where the mesh for `entry` is written
    pub fn output_path(&self, entry: &TokenEntry) -> PathBuf {
        self.output_dir.join(output_file_name(&entry.name, self.format))
    }

    fn load_image(&self, path: &Path) -> Result<CanonicalImage, TokenCliError> {
        let canonical = match self.images {
            ImageKind::Canonical => load_canonical(path)?,
            ImageKind::Raw => self.pipeline().normalize(&load_rgba(path)?)?,
        };
        Ok(canonical)
    }

    /// Build and export a single token, returning the written path
    pub fn generate(&self, entry: &TokenEntry) -> Result<PathBuf, TokenCliError> {
        rim_layout(&entry.name)?;
        let canonical = self.load_image(&entry.image)?;
        debug!(name = %entry.name, side = canonical.side(), "loaded token image");

        let contours = self.pipeline().contours(&canonical)?;
        let token = assemble_token_from_contours(
            &self.token,
            &entry.name,
            contours,
            canonical.width(),
            canonical.height(),
        )?;
        let mesh = token.to_mesh()?;
        let out = self.output_path(entry);
        save_mesh(&mesh, &out, self.format)?;
        Ok(out)
    }
}

/// Outcome of a batch run, in token order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub generated: Vec<(String, PathBuf)>,
    pub failed: Vec<(String, String)>,
}

/// Run `job` for every token on the blocking pool, at most `jobs` at a
/// time. A job that errors or panics fails only its own token.
pub async fn run_batch<F>(config: Arc<BatchConfig>, jobs: usize, job: F) -> Result<BatchReport, TokenCliError>
where
    F: Fn(&BatchConfig, &TokenEntry) -> Result<PathBuf, TokenCliError> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut handles = Vec::with_capacity(config.tokens.len());

    for index in 0..config.tokens.len() {
        let permit = Arc::clone(&permits).acquire_owned().await?;
        let name = config.tokens[index].name.clone();
        let config = Arc::clone(&config);
        let job = Arc::clone(&job);
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let entry = &config.tokens[index];
            info!("Working on {}", entry.name);
            job(&config, entry)
        });
        handles.push((name, handle));
    }

    let mut report = BatchReport::default();
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(path)) => {
                info!("Generated {}: {}", name, path.display());
                report.generated.push((name, path));
            }
            Ok(Err(e)) => {
                error!("Failed to generate {}: {}", name, e);
                report.failed.push((name, e.to_string()));
            }
            Err(e) => {
                error!("Task for {} did not finish: {}", name, e);
                report.failed.push((name, e.to_string()));
            }
        }
    }
    Ok(report)
}
