use geo_types::{Coord, LineString, Polygon};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SilhouetteError};

pub(crate) const FOREGROUND: Luma<u8> = Luma([255]);
pub(crate) const BACKGROUND: Luma<u8> = Luma([0]);

/// Inclusive pixel bounds of foreground content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

fn foreground_bounds(image: &GrayImage) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        match bounds.as_mut() {
            Some(b) => b.include(x, y),
            None => {
                bounds = Some(BoundingBox { min_x: x, min_y: y, max_x: x, max_y: y });
            }
        }
    }
    bounds
}

/// Per-pixel foreground/background decision for a source image.
///
/// Stored as a single-channel image holding 255 for foreground and 0 for
/// background so it can feed `imageproc` routines directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    bits: GrayImage,
}

impl Mask {
    /// Create an all-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self { bits: GrayImage::new(width, height) }
    }

    /// Build a mask from a predicate evaluated at every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut is_foreground: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let bits = GrayImage::from_fn(width, height, |x, y| {
            if is_foreground(x, y) { FOREGROUND } else { BACKGROUND }
        });
        Self { bits }
    }

    pub fn width(&self) -> u32 {
        self.bits.width()
    }

    pub fn height(&self) -> u32 {
        self.bits.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.bits.get_pixel(x, y)[0] > 0
    }

    pub fn foreground_count(&self) -> usize {
        self.bits.pixels().filter(|p| p[0] > 0).count()
    }

    /// Tight bounds of all foreground pixels, `None` for an empty mask
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        foreground_bounds(&self.bits)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.bits
    }
}

/// Square, tightly cropped, centered binary silhouette
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalImage {
    pixels: GrayImage,
}

impl CanonicalImage {
    /// Wrap a square grayscale image, treating every non-zero pixel as foreground
    pub fn from_gray(image: GrayImage) -> Result<Self> {
        if image.width() != image.height() {
            return Err(SilhouetteError::InvalidParameter(format!(
                "canonical image must be square, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        let pixels = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if image.get_pixel(x, y)[0] > 0 { FOREGROUND } else { BACKGROUND }
        });
        Ok(Self { pixels })
    }

    pub(crate) fn from_square(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    /// Side length in pixels
    pub fn side(&self) -> u32 {
        self.pixels.width()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] > 0
    }

    pub fn foreground_count(&self) -> usize {
        self.pixels.pixels().filter(|p| p[0] > 0).count()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        foreground_bounds(&self.pixels)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    /// View the silhouette as a mask, e.g. to normalize it again
    pub fn to_mask(&self) -> Mask {
        Mask { bits: self.pixels.clone() }
    }

    /// Four-channel rendering: transparent background, opaque white foreground
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            if self.is_foreground(x, y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}

/// Closed polygon boundary of one foreground region, in pixel coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<[u32; 2]>,
}

impl Contour {
    pub fn new(points: Vec<[u32; 2]>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A contour needs at least three points to enclose anything
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let (&[x, y], rest) = self.points.split_first()?;
        let mut bounds = BoundingBox { min_x: x, min_y: y, max_x: x, max_y: y };
        for &[x, y] in rest {
            bounds.include(x, y);
        }
        Some(bounds)
    }

    /// Convert to a geo-types polygon in pixel space
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .points
            .iter()
            .map(|&[x, y]| Coord { x: f64::from(x), y: f64::from(y) })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Enclosed area in square pixels (pixel-center polygon)
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }
}

/// Finite, ordered sequence of contours produced by a single extraction.
///
/// Call the extractor again to iterate from the start.
#[derive(Debug, Clone)]
pub struct Contours {
    inner: std::vec::IntoIter<Contour>,
}

impl Contours {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { inner: contours.into_iter() }
    }
}

impl Iterator for Contours {
    type Item = Contour;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Contours {}
