use image::{GrayImage, imageops};
use tracing::debug;

use crate::{
    error::{Result, SilhouetteError},
    types::{CanonicalImage, Mask},
};

/// Crops a mask to its content, pads it, and centers it on a square canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    pub padding_px: u32,
}

impl Normalizer {
    pub fn new(padding_px: u32) -> Self {
        Self { padding_px }
    }

    pub fn normalize(&self, mask: &Mask) -> Result<CanonicalImage> {
        normalize(mask, self.padding_px)
    }
}

/// Offset that centers `inner` inside `outer`, rounding toward the top/left
fn centering_offset(outer: u32, inner: u32) -> u32 {
    (outer - inner) / 2
}

pub fn normalize(mask: &Mask, padding_px: u32) -> Result<CanonicalImage> {
    let bbox = mask.bounding_box().ok_or(SilhouetteError::EmptyForeground)?;

    let cropped = imageops::crop_imm(
        mask.as_gray(),
        bbox.min_x,
        bbox.min_y,
        bbox.width(),
        bbox.height(),
    )
    .to_image();

    let padded = if padding_px > 0 {
        let mut padded = GrayImage::new(
            cropped.width() + 2 * padding_px,
            cropped.height() + 2 * padding_px,
        );
        imageops::replace(&mut padded, &cropped, i64::from(padding_px), i64::from(padding_px));
        padded
    } else {
        cropped
    };

    let (w, h) = padded.dimensions();
    let size = w.max(h);
    let x_off = centering_offset(size, w);
    let y_off = centering_offset(size, h);

    let mut square = GrayImage::new(size, size);
    imageops::replace(&mut square, &padded, i64::from(x_off), i64::from(y_off));

    debug!(
        crop_width = bbox.width(),
        crop_height = bbox.height(),
        padding_px,
        size,
        x_off,
        y_off,
        "normalized mask"
    );

    Ok(CanonicalImage::from_square(square))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mask_fails() {
        let mask = Mask::new(10, 10);
        assert!(matches!(normalize(&mask, 0), Err(SilhouetteError::EmptyForeground)));
    }

    #[test]
    fn test_crop_is_tight() {
        let mask = Mask::from_fn(4, 4, |x, y| (1..=2).contains(&x) && (1..=2).contains(&y));
        let canonical = normalize(&mask, 0).expect("Should normalize");
        assert_eq!(canonical.side(), 2);
        assert_eq!(canonical.foreground_count(), 4);
    }

    #[test]
    fn test_wide_content_is_centered_vertically() {
        // 5 wide, 2 tall -> 5x5 square with rows offset by (5-2)/2 = 1
        let mask = Mask::from_fn(10, 10, |x, y| (3..8).contains(&x) && (4..6).contains(&y));
        let canonical = normalize(&mask, 0).expect("Should normalize");
        assert_eq!(canonical.side(), 5);
        for x in 0..5 {
            assert!(!canonical.is_foreground(x, 0));
            assert!(canonical.is_foreground(x, 1));
            assert!(canonical.is_foreground(x, 2));
            assert!(!canonical.is_foreground(x, 3));
            assert!(!canonical.is_foreground(x, 4));
        }
    }

    #[test]
    fn test_tall_content_offset_rounds_down() {
        // 2 wide, 5 tall -> columns offset by floor(3/2) = 1, leaving 2 empty columns on the right
        let mask = Mask::from_fn(6, 6, |x, y| x < 2 && y < 5);
        let canonical = normalize(&mask, 0).expect("Should normalize");
        let bbox = canonical.bounding_box().expect("Has content");
        assert_eq!(bbox.min_x, 1);
        assert_eq!(bbox.max_x, 2);
        assert_eq!(bbox.min_y, 0);
        assert_eq!(bbox.max_y, 4);
    }

    #[test]
    fn test_padding_surrounds_content() {
        let mask = Mask::from_fn(3, 3, |x, y| x == 1 && y == 1);
        let canonical = Normalizer::new(2).normalize(&mask).expect("Should normalize");
        assert_eq!(canonical.side(), 5);
        assert!(canonical.is_foreground(2, 2));
        assert_eq!(canonical.foreground_count(), 1);
    }

    #[test]
    fn test_normalizing_canonical_image_is_noop() {
        let mask = Mask::from_fn(12, 9, |x, y| (x + y) % 3 == 0 && x > 2 && y > 1);
        let canonical = normalize(&mask, 0).expect("Should normalize");
        let again = normalize(&canonical.to_mask(), 0).expect("Should normalize again");
        assert_eq!(canonical.as_gray().as_raw(), again.as_gray().as_raw());
    }
}
