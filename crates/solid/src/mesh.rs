use geo::Area;
use geo::orient::{Direction, Orient};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use tracing::debug;

use crate::{
    error::{Result, SolidError},
    solid::{Layer, Solid, difference_footprints},
};

pub type Vertex = [f64; 3];
pub type Triangle = [Vertex; 3];

/// Triangle soup with outward-facing winding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub triangles: Vec<Triangle>,
}

fn sub(a: Vertex, b: Vertex) -> Vertex {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: Vertex, b: Vertex) -> Vertex {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: Vertex, b: Vertex) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Unit normal from the right-hand rule, zero for degenerate triangles
pub fn triangle_normal(triangle: &Triangle) -> Vertex {
    let n = cross(sub(triangle[1], triangle[0]), sub(triangle[2], triangle[0]));
    let len = dot(n, n).sqrt();
    if len > 0.0 { [n[0] / len, n[1] / len, n[2] / len] } else { [0.0; 3] }
}

impl TriangleMesh {
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let n = cross(sub(t[1], t[0]), sub(t[2], t[0]));
                dot(n, n).sqrt() / 2.0
            })
            .sum()
    }

    /// Enclosed volume by the divergence theorem; positive for outward winding
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| dot(t[0], cross(t[1], t[2])) / 6.0)
            .sum()
    }
}

/// Ring coordinates without the closing duplicate
fn open_ring(ring: &LineString<f64>) -> &[Coord<f64>] {
    let coords = ring.0.as_slice();
    match coords {
        [first, .., last] if first == last => &coords[..coords.len() - 1],
        _ => coords,
    }
}

fn lift(c: Coord<f64>, z: f64) -> Vertex {
    [c.x, c.y, z]
}

fn push_walls(ring: &[Coord<f64>], z_min: f64, z_max: f64, out: &mut Vec<Triangle>) {
    let n = ring.len();
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        out.push([lift(p, z_min), lift(q, z_min), lift(q, z_max)]);
        out.push([lift(p, z_min), lift(q, z_max), lift(p, z_max)]);
    }
}

type Flat = [Coord<f64>; 3];

fn twice_area(t: &Flat) -> f64 {
    let [a, b, c] = *t;
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Counter-clockwise copy of `t`
fn ccw(t: Flat) -> Flat {
    if twice_area(&t) >= 0.0 { t } else { [t[0], t[2], t[1]] }
}

fn covers_area(triangles: &[Flat], area: f64) -> bool {
    let covered: f64 = triangles.iter().map(|t| twice_area(t).abs() / 2.0).sum();
    (covered - area).abs() <= 1e-9 * area.max(1.0)
}

fn earcut_triangles(polygon: &Polygon<f64>) -> Option<Vec<Flat>> {
    let mut flat: Vec<f64> = Vec::new();
    let mut points: Vec<Coord<f64>> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    for (i, ring) in std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .enumerate()
    {
        if i > 0 {
            hole_indices.push(points.len());
        }
        for &c in open_ring(ring) {
            flat.push(c.x);
            flat.push(c.y);
            points.push(c);
        }
    }

    let indices = earcutr::earcut(&flat, &hole_indices, 2).ok()?;
    Some(
        indices
            .chunks_exact(3)
            .map(|tri| ccw([points[tri[0]], points[tri[1]], points[tri[2]]]))
            .collect(),
    )
}

fn x_at(p: Coord<f64>, q: Coord<f64>, y: f64) -> f64 {
    if y == p.y {
        p.x
    } else if y == q.y {
        q.x
    } else {
        p.x + (q.x - p.x) * (y - p.y) / (q.y - p.y)
    }
}

/// Even-odd decomposition into trapezoids between consecutive vertex
/// heights. Handles touching and overlapping ring edges.
fn strip_triangles(polygon: &Polygon<f64>) -> Vec<Flat> {
    let mut edges: Vec<(Coord<f64>, Coord<f64>)> = Vec::new();
    let mut heights: Vec<f64> = Vec::new();
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let coords = open_ring(ring);
        let n = coords.len();
        for i in 0..n {
            let (p, q) = (coords[i], coords[(i + 1) % n]);
            heights.push(p.y);
            if p.y != q.y {
                edges.push(if p.y < q.y { (p, q) } else { (q, p) });
            }
        }
    }
    heights.sort_by(f64::total_cmp);
    heights.dedup();

    let mut triangles = Vec::new();
    for band in heights.windows(2) {
        let (y0, y1) = (band[0], band[1]);
        let mut crossings: Vec<(f64, f64)> = edges
            .iter()
            .filter(|(low, high)| low.y <= y0 && y1 <= high.y)
            .map(|&(low, high)| (x_at(low, high, y0), x_at(low, high, y1)))
            .collect();
        crossings.sort_by(|a, b| (a.0 + a.1).total_cmp(&(b.0 + b.1)));

        for pair in crossings.chunks_exact(2) {
            let (left, right) = (pair[0], pair[1]);
            let quad = [
                Coord { x: left.0, y: y0 },
                Coord { x: right.0, y: y0 },
                Coord { x: right.1, y: y1 },
                Coord { x: left.1, y: y1 },
            ];
            for t in [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
                if twice_area(&t) != 0.0 {
                    triangles.push(ccw(t));
                }
            }
        }
    }
    triangles
}

/// Counter-clockwise triangles exactly covering `polygon`
fn cap_triangles(polygon: &Polygon<f64>) -> Result<Vec<Flat>> {
    let area = polygon.unsigned_area();
    if let Some(triangles) = earcut_triangles(polygon) {
        if covers_area(&triangles, area) {
            return Ok(triangles);
        }
    }

    let triangles = strip_triangles(polygon);
    if !covers_area(&triangles, area) {
        return Err(SolidError::Triangulation(format!(
            "cap of area {area} could not be triangulated"
        )));
    }
    debug!(triangles = triangles.len(), "triangulated cap in strips");
    Ok(triangles)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Facing {
    Up,
    Down,
}

fn push_cap(region: &MultiPolygon<f64>, z: f64, facing: Facing, out: &mut Vec<Triangle>) -> Result<()> {
    for polygon in &region.0 {
        for [a, b, c] in cap_triangles(polygon)? {
            out.push(match facing {
                Facing::Up => [lift(a, z), lift(b, z), lift(c, z)],
                Facing::Down => [lift(a, z), lift(c, z), lift(b, z)],
            });
        }
    }
    Ok(())
}

/// Horizontal faces where the region below a plane differs from the one
/// above it: upward where only `below` has area, downward where only
/// `above` does
fn push_boundary(
    below: &MultiPolygon<f64>,
    above: &MultiPolygon<f64>,
    z: f64,
    out: &mut Vec<Triangle>,
) -> Result<()> {
    push_cap(&difference_footprints(below, above), z, Facing::Up, out)?;
    push_cap(&difference_footprints(above, below), z, Facing::Down, out)
}

fn push_layer_walls(layer: &Layer, out: &mut Vec<Triangle>) {
    for polygon in &layer.footprint.0 {
        let polygon = polygon.orient(Direction::Default);
        push_walls(open_ring(polygon.exterior()), layer.z_min, layer.z_max, out);
        for hole in polygon.interiors() {
            push_walls(open_ring(hole), layer.z_min, layer.z_max, out);
        }
    }
}

impl Solid {
    /// Triangulate the layer stack into a closed surface. Where two layers
    /// meet, only the part of the plane covered by exactly one of them gets
    /// a face.
    pub fn to_mesh(&self) -> Result<TriangleMesh> {
        let empty = MultiPolygon(Vec::new());
        let layers = self.layers();
        let mut triangles = Vec::new();

        for (i, layer) in layers.iter().enumerate() {
            push_layer_walls(layer, &mut triangles);

            let below = match i.checked_sub(1).map(|j| &layers[j]) {
                Some(prev) if prev.z_max == layer.z_min => &prev.footprint,
                _ => &empty,
            };
            push_boundary(below, &layer.footprint, layer.z_min, &mut triangles)?;

            let continues = layers.get(i + 1).is_some_and(|next| next.z_min == layer.z_max);
            if !continues {
                push_boundary(&layer.footprint, &empty, layer.z_max, &mut triangles)?;
            }
        }
        debug!(layers = layers.len(), triangles = triangles.len(), "triangulated solid");
        Ok(TriangleMesh { triangles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::ring;
    use approx::assert_relative_eq;
    use crate::token::{TokenConfig, base_solid};
    use geo_types::polygon;
    use std::collections::HashMap;

    fn square(x: f64, y: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x, y: y),
            (x: x + side, y: y),
            (x: x + side, y: y + side),
            (x: x, y: y + side),
        ]])
    }

    fn edge_key(a: Vertex, b: Vertex) -> ([u64; 3], [u64; 3]) {
        // + 0.0 folds -0.0 onto 0.0
        let bits = |v: Vertex| v.map(|c| (c + 0.0).to_bits());
        let (a, b) = (bits(a), bits(b));
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Every undirected edge is used by exactly two triangles
    fn assert_edge_manifold(mesh: &TriangleMesh) {
        let mut uses: HashMap<([u64; 3], [u64; 3]), usize> = HashMap::new();
        for t in &mesh.triangles {
            for i in 0..3 {
                *uses.entry(edge_key(t[i], t[(i + 1) % 3])).or_default() += 1;
            }
        }
        let bad = uses.values().filter(|&&count| count != 2).count();
        assert_eq!(bad, 0, "{bad} of {} edges are not shared by two triangles", uses.len());
    }

    fn unit_cube() -> Solid {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        Solid::slab(MultiPolygon(vec![square]), 0.0, 1.0).expect("Valid slab")
    }

    #[test]
    fn test_cube_mesh() {
        let mesh = unit_cube().to_mesh().expect("Should triangulate");
        // 2 caps x 2 triangles + 4 walls x 2 triangles
        assert_eq!(mesh.len(), 12);
        assert_relative_eq!(mesh.surface_area(), 6.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_input_still_faces_outward() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 0.0, y: 2.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0)];
        let solid = Solid::slab(MultiPolygon(vec![square]), 1.0, 1.0).expect("Valid slab");
        let mesh = solid.to_mesh().expect("Should triangulate");
        assert_relative_eq!(mesh.signed_volume(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ring_mesh_volume_matches_solid() {
        let solid = ring(20.0, 15.0, 4.0, 2.0, 48).expect("Valid ring");
        let mesh = solid.to_mesh().expect("Should triangulate");
        assert_relative_eq!(mesh.signed_volume(), solid.volume(), epsilon = 1e-6);
    }

    #[test]
    fn test_stacked_layers_share_one_face_per_plane() {
        let base = Solid::slab(square(0.0, 0.0, 4.0), 0.0, 2.0).expect("Valid slab");
        let post = Solid::slab(square(1.0, 1.0, 2.0), 2.0, 1.0).expect("Valid slab");
        let solid = base.union(&post);
        let mesh = solid.to_mesh().expect("Should triangulate");

        assert_relative_eq!(mesh.signed_volume(), 36.0, epsilon = 1e-9);
        // at z = 2 only the uncovered frame of the base faces up
        let at_two: f64 = mesh
            .triangles
            .iter()
            .filter(|t| t.iter().all(|v| v[2] == 2.0))
            .map(|t| {
                let n = cross(sub(t[1], t[0]), sub(t[2], t[0]));
                dot(n, n).sqrt() / 2.0
            })
            .sum();
        assert_relative_eq!(at_two, 12.0, epsilon = 1e-9);
        assert_edge_manifold(&mesh);
    }

    #[test]
    fn test_base_mesh_is_edge_manifold() {
        let base = base_solid(&TokenConfig::default()).expect("Valid base");
        let mesh = base.to_mesh().expect("Should triangulate");
        assert_edge_manifold(&mesh);
        assert_relative_eq!(mesh.signed_volume(), base.volume(), max_relative = 1e-9);
    }

    #[test]
    fn test_overhang_gets_downward_face() {
        let stem = Solid::slab(square(0.0, 0.0, 1.0), 0.0, 1.0).expect("Valid slab");
        let shelf = Solid::slab(square(-1.0, -1.0, 3.0), 1.0, 1.0).expect("Valid slab");
        let mesh = stem.union(&shelf).to_mesh().expect("Should triangulate");
        assert_relative_eq!(mesh.signed_volume(), 1.0 + 9.0, epsilon = 1e-9);
        let down = mesh
            .triangles
            .iter()
            .filter(|t| t.iter().all(|v| v[2] == 1.0))
            .all(|t| triangle_normal(t)[2] < -0.99);
        assert!(down);
        assert_edge_manifold(&mesh);
    }

    #[test]
    fn test_strip_fallback_covers_pinched_polygon() {
        // two triangles meeting at (2, 2), traced as one ring
        let pinched = polygon![
            (x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 2.0, y: 2.0),
            (x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 2.0, y: 2.0),
        ];
        let triangles = strip_triangles(&pinched);
        assert!(covers_area(&triangles, pinched.unsigned_area()));
        assert!(triangles.iter().all(|t| twice_area(t) > 0.0));

        let with_hole = Polygon::new(
            square(0.0, 0.0, 4.0).0[0].exterior().clone(),
            vec![square(1.0, 1.0, 1.0).0[0].exterior().clone()],
        );
        let triangles = strip_triangles(&with_hole);
        assert_relative_eq!(
            triangles.iter().map(|t| twice_area(t) / 2.0).sum::<f64>(),
            15.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_top_cap_normals_point_up() {
        let mesh = unit_cube().to_mesh().expect("Should triangulate");
        let up = mesh
            .triangles
            .iter()
            .filter(|t| t.iter().all(|v| v[2] == 1.0))
            .all(|t| triangle_normal(t)[2] > 0.99);
        assert!(up);
    }
}
