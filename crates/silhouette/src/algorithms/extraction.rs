use image::{GrayImage, imageops};
use imageproc::contours::BorderType;
use tracing::debug;

use crate::{
    error::{Result, SilhouetteError},
    traits::ContourExtractor,
    types::{Contour, Contours},
};

/// Outer-boundary contour extractor.
///
/// Runs Suzuki-Abe border following (`imageproc::contours::find_contours`)
/// and keeps only outermost borders; holes and anything nested inside them
/// are dropped. Runs of points stepping in the same direction are
/// compressed to their end points.
///
/// The binary image is traced inside a one pixel zero frame so shapes
/// touching the image edge still start an outer border; traced points are
/// shifted back into image coordinates.
#[derive(Debug, Clone, Default)]
pub struct ExternalContourExtractor;

impl ContourExtractor for ExternalContourExtractor {
    fn extract_contours(&self, image: &GrayImage) -> Result<Contours> {
        let binary = imageproc::contrast::threshold(image, 0);
        let framed = framed(&binary);
        let raw = imageproc::contours::find_contours::<u32>(&framed);
        let found = raw.len();

        let contours: Vec<Contour> = raw
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                let points: Vec<[u32; 2]> = c
                    .points
                    .iter()
                    .map(|p| [p.x.saturating_sub(1), p.y.saturating_sub(1)])
                    .collect();
                Contour::new(compress_chain(&points))
            })
            .filter(Contour::is_valid)
            .collect();

        debug!(found, kept = contours.len(), "extracted external contours");

        if contours.is_empty() {
            return Err(SilhouetteError::NoContours);
        }
        Ok(Contours::new(contours))
    }
}

pub fn extract_contours(image: &GrayImage) -> Result<Contours> {
    ExternalContourExtractor.extract_contours(image)
}

/// Copy of `binary` centered on a zero canvas one pixel larger on each side
fn framed(binary: &GrayImage) -> GrayImage {
    let mut canvas = GrayImage::new(binary.width() + 2, binary.height() + 2);
    imageops::replace(&mut canvas, binary, 1, 1);
    canvas
}

fn step(from: [u32; 2], to: [u32; 2]) -> [i64; 2] {
    [
        i64::from(to[0]) - i64::from(from[0]),
        i64::from(to[1]) - i64::from(from[1]),
    ]
}

fn same_direction(a: [i64; 2], b: [i64; 2]) -> bool {
    a[0] * b[1] - a[1] * b[0] == 0 && a[0] * b[0] + a[1] * b[1] > 0
}

/// Remove consecutive duplicates and interior points of straight runs,
/// treating the sequence as a closed ring.
pub(crate) fn compress_chain(points: &[[u32; 2]]) -> Vec<[u32; 2]> {
    let mut ring: Vec<[u32; 2]> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let n = ring.len();
    if n < 3 {
        return ring;
    }

    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            !same_direction(step(prev, cur), step(cur, next))
        })
        .map(|i| ring[i])
        .collect()
}
