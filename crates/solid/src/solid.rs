//! Prismatic solid model.
//!
//! Every part of a token is a vertical extrusion of a planar region, so a
//! solid is stored as a stack of layers: disjoint, ascending z intervals,
//! each with the region it occupies. Boolean union then reduces to 2D
//! region unions per z interval.

use std::collections::HashMap;

use geo::{Area, BooleanOps, BoundingRect, Intersects, Rotate, Translate};
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};

use crate::error::{Result, SolidError};

/// Horizontal slice of a solid with constant cross-section
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub z_min: f64,
    pub z_max: f64,
    pub footprint: MultiPolygon<f64>,
}

impl Layer {
    pub fn thickness(&self) -> f64 {
        self.z_max - self.z_min
    }

    pub fn volume(&self) -> f64 {
        self.footprint.unsigned_area() * self.thickness()
    }

    fn covers(&self, lo: f64, hi: f64) -> bool {
        self.z_min <= lo && hi <= self.z_max
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb {
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solid {
    layers: Vec<Layer>,
}

/// Largest distance an overlay vertex is moved to land on an input vertex
const SNAP_TOLERANCE: f64 = 1e-6;

/// Overlay output below this area is noise
const SLIVER_AREA: f64 = 1e-9;

fn snap_cell(c: Coord<f64>) -> (i64, i64) {
    (
        (c.x / SNAP_TOLERANCE).floor() as i64,
        (c.y / SNAP_TOLERANCE).floor() as i64,
    )
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

/// Put overlay output back onto the exact input coordinates it came from
/// and drop slivers.
///
/// The overlay works on a quantized grid, so vertices it passes through
/// come back perturbed in the last bits. Faces built from the result
/// must meet faces built from the inputs edge to edge.
pub(crate) fn snap_to_vertices(
    result: MultiPolygon<f64>,
    sources: &[&MultiPolygon<f64>],
) -> MultiPolygon<f64> {
    let mut grid: HashMap<(i64, i64), Vec<Coord<f64>>> = HashMap::new();
    for polygon in sources.iter().flat_map(|source| &source.0) {
        for &c in rings(polygon).flat_map(|ring| &ring.0) {
            grid.entry(snap_cell(c)).or_default().push(c);
        }
    }

    let snap = |c: Coord<f64>| -> Coord<f64> {
        let (cx, cy) = snap_cell(c);
        let mut best = c;
        let mut best_distance = SNAP_TOLERANCE * SNAP_TOLERANCE;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for &candidate in grid.get(&(cx + dx, cy + dy)).into_iter().flatten() {
                    let d = (candidate.x - c.x).powi(2) + (candidate.y - c.y).powi(2);
                    if d <= best_distance {
                        best_distance = d;
                        best = candidate;
                    }
                }
            }
        }
        best
    };
    let snap_ring = |ring: LineString<f64>| -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = ring.0.into_iter().map(snap).collect();
        coords.dedup();
        LineString::new(coords)
    };

    MultiPolygon(
        result
            .0
            .into_iter()
            .map(|polygon| {
                let (exterior, interiors) = polygon.into_inner();
                Polygon::new(snap_ring(exterior), interiors.into_iter().map(snap_ring).collect())
            })
            .filter(|polygon| polygon.unsigned_area() > SLIVER_AREA)
            .collect(),
    )
}

fn disjoint(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    match (a.bounding_rect(), b.bounding_rect()) {
        (Some(ra), Some(rb)) => !ra.intersects(&rb),
        _ => true,
    }
}

/// Union of two planar regions. Regions whose bounding rectangles do not
/// touch are concatenated without running the overlay.
pub(crate) fn union_footprints(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() || a == b {
        return b.clone();
    }
    if b.0.is_empty() {
        return a.clone();
    }
    if disjoint(a, b) {
        let mut polygons = a.0.clone();
        polygons.extend(b.0.iter().cloned());
        return MultiPolygon(polygons);
    }
    snap_to_vertices(a.union(b), &[a, b])
}

/// Part of `a` not covered by `b`
pub(crate) fn difference_footprints(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a == b {
        return MultiPolygon(Vec::new());
    }
    if a.0.is_empty() || b.0.is_empty() || disjoint(a, b) {
        return a.clone();
    }
    snap_to_vertices(a.difference(b), &[a, b])
}

impl Solid {
    /// Extrude `footprint` upward from `z_min` by `thickness`
    pub fn slab(footprint: MultiPolygon<f64>, z_min: f64, thickness: f64) -> Result<Self> {
        if !z_min.is_finite() || !thickness.is_finite() || thickness <= 0.0 {
            return Err(SolidError::GeometryConstruction(format!(
                "slab needs a finite base and positive thickness, got z_min={z_min}, thickness={thickness}"
            )));
        }
        if footprint.unsigned_area() <= 0.0 {
            return Err(SolidError::GeometryConstruction(
                "slab footprint encloses no area".to_string(),
            ));
        }
        Ok(Self {
            layers: vec![Layer {
                z_min,
                z_max: z_min + thickness,
                footprint,
            }],
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn volume(&self) -> f64 {
        self.layers.iter().map(Layer::volume).sum()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for layer in &self.layers {
            let Some(rect) = layer.footprint.bounding_rect() else {
                continue;
            };
            let min = [rect.min().x, rect.min().y, layer.z_min];
            let max = [rect.max().x, rect.max().y, layer.z_max];
            bounds = Some(match bounds {
                None => Aabb { min, max },
                Some(b) => Aabb {
                    min: [b.min[0].min(min[0]), b.min[1].min(min[1]), b.min[2].min(min[2])],
                    max: [b.max[0].max(max[0]), b.max[1].max(max[1]), b.max[2].max(max[2])],
                },
            });
        }
        bounds
    }

    /// Boolean union. The result does not depend on operand order.
    pub fn union(&self, other: &Solid) -> Solid {
        let mut cuts: Vec<f64> = self
            .layers
            .iter()
            .chain(&other.layers)
            .flat_map(|layer| [layer.z_min, layer.z_max])
            .collect();
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        let mut layers: Vec<Layer> = Vec::new();
        for window in cuts.windows(2) {
            let (lo, hi) = (window[0], window[1]);
            let footprint = self
                .layers
                .iter()
                .chain(&other.layers)
                .filter(|layer| layer.covers(lo, hi))
                .fold(MultiPolygon(Vec::new()), |acc, layer| {
                    union_footprints(&acc, &layer.footprint)
                });
            if footprint.0.is_empty() {
                continue;
            }

            match layers.last_mut() {
                Some(last) if last.z_max == lo && last.footprint == footprint => last.z_max = hi,
                _ => layers.push(Layer { z_min: lo, z_max: hi, footprint }),
            }
        }

        Solid { layers }
    }

    /// Union of any number of solids; `None` when there are none
    pub fn union_all<I>(solids: I) -> Option<Solid>
    where
        I: IntoIterator<Item = Solid>,
    {
        solids.into_iter().reduce(|acc, solid| acc.union(&solid))
    }

    /// Rotate about the vertical axis through the origin, counter-clockwise
    /// for positive angles
    pub fn rotate_z(&self, degrees: f64) -> Solid {
        let origin = Point::new(0.0, 0.0);
        Solid {
            layers: self
                .layers
                .iter()
                .map(|layer| Layer {
                    footprint: layer.footprint.rotate_around_point(degrees, origin),
                    ..layer.clone()
                })
                .collect(),
        }
    }

    pub fn translate(&self, dx: f64, dy: f64, dz: f64) -> Solid {
        Solid {
            layers: self
                .layers
                .iter()
                .map(|layer| Layer {
                    z_min: layer.z_min + dz,
                    z_max: layer.z_max + dz,
                    footprint: layer.footprint.translate(dx, dy),
                })
                .collect(),
        }
    }
}
