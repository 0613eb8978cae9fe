use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{info, warn};

use crate::{
    error::{Result, SilhouetteError},
    pipeline::Pipeline,
    types::CanonicalImage,
};

/// Extension written for persisted canonical images
pub const CANONICAL_EXTENSION: &str = "png";

/// Decode any supported raster file into RGBA
pub fn load_rgba(path: impl AsRef<Path>) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Read a persisted canonical image; any non-zero luma is foreground
pub fn load_canonical(path: impl AsRef<Path>) -> Result<CanonicalImage> {
    let gray = image::open(path)?.to_luma8();
    CanonicalImage::from_gray(gray)
}

impl CanonicalImage {
    /// Save as a four-channel PNG, creating parent directories
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_rgba()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Mirror `file` (which lives under `input_root`) into `output_root`,
/// replacing its extension with `png`
pub fn mirrored_output_path(input_root: &Path, output_root: &Path, file: &Path) -> Result<PathBuf> {
    let relative = file.strip_prefix(input_root).map_err(|_| {
        SilhouetteError::InvalidParameter(format!(
            "{} is not inside {}",
            file.display(),
            input_root.display()
        ))
    })?;
    Ok(output_root.join(relative).with_extension(CANONICAL_EXTENSION))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Recursively collect files under `root` with one of `extensions`, sorted
pub fn collect_images(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_extension(&path, extensions) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Outcome of converting a directory tree
#[derive(Debug, Default)]
pub struct TreeReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Normalize every matching image under `input_root` into a mirrored tree
/// of canonical PNGs. Individual failures are recorded, not fatal.
pub fn normalize_tree(
    pipeline: &Pipeline,
    input_root: &Path,
    output_root: &Path,
    extensions: &[String],
) -> Result<TreeReport> {
    let mut report = TreeReport::default();

    for file in collect_images(input_root, extensions)? {
        let out_path = mirrored_output_path(input_root, output_root, &file)?;
        let converted = load_rgba(&file)
            .and_then(|rgba| pipeline.normalize(&rgba))
            .and_then(|canonical| canonical.save_png(&out_path));

        match converted {
            Ok(()) => {
                info!("Converted: {} -> {}", file.display(), out_path.display());
                report.converted.push(out_path);
            }
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                report.failed.push((file, e.to_string()));
            }
        }
    }

    Ok(report)
}
