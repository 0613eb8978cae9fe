pub mod segmentation;
pub mod normalization;
pub mod extraction;

pub use segmentation::*;
pub use normalization::*;
pub use extraction::*;
