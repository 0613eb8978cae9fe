use image::{GrayImage, RgbaImage};
use crate::{error::Result, types::{Contours, Mask}};

/// Trait for foreground/background segmentation of color images
pub trait ForegroundSegmenter: Send + Sync {
    /// Decide for every pixel whether it belongs to the subject
    fn segment(&self, image: &RgbaImage) -> Mask;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract closed contours from a binary image (non-zero = foreground)
    fn extract_contours(&self, image: &GrayImage) -> Result<Contours>;
}
