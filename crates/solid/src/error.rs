use std::path::PathBuf;

use silhouette::SilhouetteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolidError {
    #[error("No valid contours left to extrude")]
    NoValidContours,

    #[error("Geometry construction failed: {0}")]
    GeometryConstruction(String),

    #[error("Triangulation failed: {0}")]
    Triangulation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid token name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Failed to write {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Silhouette(#[from] SilhouetteError),
}

pub type Result<T> = std::result::Result<T, SolidError>;
