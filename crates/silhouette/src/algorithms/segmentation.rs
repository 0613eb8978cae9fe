use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::{
    config::{DEFAULT_ALPHA_THRESHOLD, DEFAULT_WHITE_THRESHOLD},
    traits::ForegroundSegmenter,
    types::Mask,
};

/// Alpha + whiteness threshold segmenter.
///
/// A pixel is foreground when it is not (nearly) transparent and not
/// (nearly) white: `alpha > alpha_threshold` and at least one of red, green
/// or blue is `<= white_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdSegmenter {
    pub alpha_threshold: u8,
    pub white_threshold: u8,
}

impl Default for ThresholdSegmenter {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            white_threshold: DEFAULT_WHITE_THRESHOLD,
        }
    }
}

impl ThresholdSegmenter {
    pub fn new(alpha_threshold: u8, white_threshold: u8) -> Self {
        Self { alpha_threshold, white_threshold }
    }

    pub fn is_foreground(&self, pixel: &Rgba<u8>) -> bool {
        let [r, g, b, a] = pixel.0;
        let opaque = a > self.alpha_threshold;
        let white = r > self.white_threshold && g > self.white_threshold && b > self.white_threshold;
        opaque && !white
    }
}

impl ForegroundSegmenter for ThresholdSegmenter {
    fn segment(&self, image: &RgbaImage) -> Mask {
        let mask = Mask::from_fn(image.width(), image.height(), |x, y| {
            self.is_foreground(image.get_pixel(x, y))
        });
        debug!(
            width = image.width(),
            height = image.height(),
            foreground = mask.foreground_count(),
            "segmented image"
        );
        mask
    }
}

/// Segment with explicit thresholds
pub fn segment(image: &RgbaImage, alpha_threshold: u8, white_threshold: u8) -> Mask {
    ThresholdSegmenter::new(alpha_threshold, white_threshold).segment(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_and_white_are_background() {
        let segmenter = ThresholdSegmenter::default();
        assert!(!segmenter.is_foreground(&Rgba([0, 0, 0, 10])));
        assert!(segmenter.is_foreground(&Rgba([0, 0, 0, 11])));
        assert!(!segmenter.is_foreground(&Rgba([191, 191, 191, 255])));
        assert!(segmenter.is_foreground(&Rgba([190, 255, 255, 255])));
        assert!(segmenter.is_foreground(&Rgba([255, 255, 12, 255])));
    }

    #[test]
    fn test_segment_marks_only_subject_pixels() {
        let mut image = RgbaImage::new(3, 1);
        image.put_pixel(0, 0, Rgba([20, 30, 40, 255]));
        image.put_pixel(1, 0, Rgba([250, 250, 250, 255]));
        image.put_pixel(2, 0, Rgba([20, 30, 40, 0]));

        let mask = segment(&image, 10, 190);
        assert!(mask.is_foreground(0, 0));
        assert!(!mask.is_foreground(1, 0));
        assert!(!mask.is_foreground(2, 0));
    }

    #[test]
    fn test_all_transparent_gives_empty_mask() {
        let image = RgbaImage::new(10, 10);
        let mask = ThresholdSegmenter::default().segment(&image);
        assert_eq!(mask.foreground_count(), 0);
    }

    #[test]
    fn test_single_subject_pixel_is_kept() {
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        image.put_pixel(5, 2, Rgba([100, 0, 0, 200]));
        let mask = ThresholdSegmenter::default().segment(&image);
        assert_eq!(mask.foreground_count(), 1);
        assert!(mask.is_foreground(5, 2));
    }
}
