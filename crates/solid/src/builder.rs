//! Contour-to-solid conversion.
//!
//! Pixel contours are mapped into a centered physical frame (image rows grow
//! downward, model Y grows upward, hence the flip), extruded into slabs and
//! unioned. The combined solid gets a fixed clockwise quarter turn about +Z
//! so the picture reads upright in the token frame.

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use silhouette::{CanonicalImage, Contour, ContourExtractor, ExternalContourExtractor};
use tracing::{debug, warn};

use crate::{
    error::{Result, SolidError},
    solid::Solid,
};

/// Lift above the requested base plane so slab faces never coincide with
/// geometry underneath
pub const Z_EPSILON: f64 = 0.01;

/// Fixed rotation of the combined solid about +Z, in degrees
pub const FRAME_ROTATION_DEG: f64 = -90.0;

/// Where and how large the extruded silhouette ends up
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SlabPlacement {
    /// Physical length of the longer image side
    pub max_physical_size: f64,
    /// Base plane of the slabs (before the epsilon lift)
    pub z_offset: f64,
    /// Slab thickness
    pub extrude_height: f64,
}

impl SlabPlacement {
    fn validate(&self) -> Result<()> {
        if !(self.max_physical_size.is_finite() && self.max_physical_size > 0.0) {
            return Err(SolidError::InvalidParameter(format!(
                "max_physical_size must be positive, got {}",
                self.max_physical_size
            )));
        }
        if !(self.extrude_height.is_finite() && self.extrude_height > 0.0) {
            return Err(SolidError::InvalidParameter(format!(
                "extrude_height must be positive, got {}",
                self.extrude_height
            )));
        }
        if !self.z_offset.is_finite() {
            return Err(SolidError::InvalidParameter(format!(
                "z_offset must be finite, got {}",
                self.z_offset
            )));
        }
        Ok(())
    }
}

/// Map a pixel coordinate into the centered, scaled, Y-up physical frame
pub fn map_point(x: u32, y: u32, width: u32, height: u32, max_physical_size: f64) -> (f64, f64) {
    let scale = max_physical_size / f64::from(width.max(height));
    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    ((f64::from(x) - cx) * scale, (cy - f64::from(y)) * scale)
}

fn dedup_ring(ring: &mut Vec<[u32; 2]>) {
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
}

fn step(from: [u32; 2], to: [u32; 2]) -> [i128; 2] {
    [
        i128::from(to[0]) - i128::from(from[0]),
        i128::from(to[1]) - i128::from(from[1]),
    ]
}

/// The path turns straight back on itself at `cur`
fn is_backtrack(prev: [u32; 2], cur: [u32; 2], next: [u32; 2]) -> bool {
    let a = step(prev, cur);
    let b = step(cur, next);
    a[0] * b[1] - a[1] * b[0] == 0 && a[0] * b[0] + a[1] * b[1] < 0
}

/// Drop repeated points and every vertex where the ring doubles back along
/// the line it arrived on, until none is left
pub(crate) fn remove_spikes(points: &[[u32; 2]]) -> Vec<[u32; 2]> {
    let mut ring = points.to_vec();
    dedup_ring(&mut ring);

    loop {
        let n = ring.len();
        if n < 3 {
            return ring;
        }
        let Some(i) = (0..n).find(|&i| is_backtrack(ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]))
        else {
            return ring;
        };
        ring.remove(i);
        dedup_ring(&mut ring);
    }
}

fn orientation(a: [u32; 2], b: [u32; 2], c: [u32; 2]) -> i128 {
    let ab = step(a, b);
    let ac = step(a, c);
    (ab[0] * ac[1] - ab[1] * ac[0]).signum()
}

/// Segments `p`-`q` and `r`-`s` cross at a point interior to both
fn crosses_properly(p: [u32; 2], q: [u32; 2], r: [u32; 2], s: [u32; 2]) -> bool {
    orientation(p, q, r) * orientation(p, q, s) < 0 && orientation(r, s, p) * orientation(r, s, q) < 0
}

fn twice_signed_area(ring: &[[u32; 2]]) -> i128 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let [x0, y0] = ring[i].map(i128::from);
            let [x1, y1] = ring[(i + 1) % n].map(i128::from);
            x0 * y1 - x1 * y0
        })
        .sum()
}

/// Check in pixel space that the cleaned ring bounds a usable polygon.
/// Touching and overlapping edges are allowed; proper crossings are not.
fn validate_ring(index: usize, ring: &[[u32; 2]]) -> Result<()> {
    let n = ring.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if crosses_properly(ring[i], ring[(i + 1) % n], ring[j], ring[(j + 1) % n]) {
                return Err(SolidError::GeometryConstruction(format!(
                    "contour {index} is self-intersecting (edges {i} and {j} cross)"
                )));
            }
        }
    }

    if twice_signed_area(ring) == 0 {
        return Err(SolidError::GeometryConstruction(format!(
            "contour {index} encloses no area"
        )));
    }
    Ok(())
}

fn footprint_polygon(index: usize, coords: Vec<Coord<f64>>) -> Result<Polygon<f64>> {
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(SolidError::GeometryConstruction(format!(
            "contour {index} maps to non-finite coordinates"
        )));
    }
    Ok(Polygon::new(LineString::new(coords), vec![]))
}

/// Extrudes pixel contours into a single solid
#[derive(Debug, Clone, Copy)]
pub struct SolidBuilder {
    placement: SlabPlacement,
}

impl SolidBuilder {
    pub fn new(placement: SlabPlacement) -> Self {
        Self { placement }
    }

    pub fn placement(&self) -> &SlabPlacement {
        &self.placement
    }

    /// Map, extrude and union every contour traced on a `width` x `height` image
    pub fn build<I>(&self, contours: I, width: u32, height: u32) -> Result<Solid>
    where
        I: IntoIterator<Item = Contour>,
    {
        self.placement.validate()?;
        if width == 0 || height == 0 {
            return Err(SolidError::InvalidParameter(format!(
                "image dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let SlabPlacement { max_physical_size, z_offset, extrude_height } = self.placement;
        let base = z_offset + Z_EPSILON;

        let mut slabs = Vec::new();
        let mut skipped = 0usize;
        for (index, contour) in contours.into_iter().enumerate() {
            let ring = remove_spikes(&contour.points);
            if ring.len() < 3 {
                warn!(index, points = contour.len(), "skipping degenerate contour");
                skipped += 1;
                continue;
            }

            validate_ring(index, &ring)?;

            let coords: Vec<Coord<f64>> = ring
                .iter()
                .map(|&[x, y]| {
                    let (px, py) = map_point(x, y, width, height, max_physical_size);
                    Coord { x: px, y: py }
                })
                .collect();
            let polygon = footprint_polygon(index, coords)?;
            slabs.push(Solid::slab(MultiPolygon(vec![polygon]), base, extrude_height)?);
        }

        debug!(slabs = slabs.len(), skipped, "extruded contours");

        let combined = Solid::union_all(slabs).ok_or(SolidError::NoValidContours)?;
        Ok(combined.rotate_z(FRAME_ROTATION_DEG))
    }

    /// Trace the outer contours of a canonical image and extrude them
    pub fn build_from_canonical(&self, canonical: &CanonicalImage) -> Result<Solid> {
        self.build_from_canonical_with(canonical, &ExternalContourExtractor)
    }

    /// Like [`Self::build_from_canonical`] with a caller-chosen extractor
    pub fn build_from_canonical_with(
        &self,
        canonical: &CanonicalImage,
        extractor: &dyn ContourExtractor,
    ) -> Result<Solid> {
        let contours = extractor.extract_contours(canonical.as_gray())?;
        self.build(contours, canonical.width(), canonical.height())
    }
}

/// Build a solid from contours with explicit placement parameters
pub fn build_solid<I>(
    contours: I,
    image_width: u32,
    image_height: u32,
    max_physical_size: f64,
    z_offset: f64,
    extrude_height: f64,
) -> Result<Solid>
where
    I: IntoIterator<Item = Contour>,
{
    SolidBuilder::new(SlabPlacement { max_physical_size, z_offset, extrude_height })
        .build(contours, image_width, image_height)
}
