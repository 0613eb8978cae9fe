//! # Silhouette Extraction Library
//!
//! Turns a raster image into a clean binary silhouette and traces the
//! outer boundary of every foreground region.
//!
//! ## Stages
//!
//! - **Segmentation**: alpha and whiteness thresholds decide foreground pixels
//! - **Normalization**: crop to content, optional padding, center on a square canvas
//! - **Contour extraction**: outer borders only, straight runs compressed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use silhouette::{Pipeline, load_rgba};
//!
//! let pipeline = Pipeline::builder()
//!     .alpha_threshold(10)
//!     .white_threshold(190)
//!     .build();
//!
//! let image = load_rgba("chef.webp")?;
//! let output = pipeline.process(&image)?;
//! output.canonical.save_png("chef.png")?;
//! println!("{} contours", output.contours.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod config;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod io;

pub use error::{SilhouetteError, Result};
pub use config::{DEFAULT_ALPHA_THRESHOLD, DEFAULT_WHITE_THRESHOLD, SilhouetteConfig};
pub use types::{BoundingBox, CanonicalImage, Contour, Contours, Mask};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, SilhouetteOutput, builder::PipelineBuilder};
pub use io::{
    ContourSet, TreeReport, collect_images, load_canonical, load_rgba, mirrored_output_path,
    normalize_tree,
};
