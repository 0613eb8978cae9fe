use std::f64::consts::TAU;

use geo_types::{Coord, LineString, MultiPolygon, Polygon};

use crate::{
    error::{Result, SolidError},
    solid::Solid,
};

fn circle_ring(radius: f64, segments: usize) -> LineString<f64> {
    let coords: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let theta = TAU * (i as f64) / (segments as f64);
            Coord { x: radius * theta.cos(), y: radius * theta.sin() }
        })
        .collect();
    LineString::new(coords)
}

fn check_segments(segments: usize) -> Result<()> {
    if segments < 3 {
        return Err(SolidError::InvalidParameter(format!(
            "a circle needs at least 3 segments, got {segments}"
        )));
    }
    Ok(())
}

/// Regular polygon approximating a circle centered at the origin
pub fn circle(radius: f64, segments: usize) -> Result<Polygon<f64>> {
    check_segments(segments)?;
    if !(radius.is_finite() && radius > 0.0) {
        return Err(SolidError::InvalidParameter(format!("circle radius must be positive, got {radius}")));
    }
    Ok(Polygon::new(circle_ring(radius, segments), vec![]))
}

/// Annulus centered at the origin
pub fn annulus(outer_radius: f64, inner_radius: f64, segments: usize) -> Result<Polygon<f64>> {
    if !(inner_radius > 0.0 && inner_radius < outer_radius) {
        return Err(SolidError::InvalidParameter(format!(
            "ring needs 0 < inner radius < outer radius, got {inner_radius} and {outer_radius}"
        )));
    }
    let outer = circle(outer_radius, segments)?;
    let mut inner = circle_ring(inner_radius, segments);
    inner.0.reverse();
    Ok(Polygon::new(outer.exterior().clone(), vec![inner]))
}

/// Cylinder standing on `z_min`
pub fn disc(radius: f64, z_min: f64, height: f64, segments: usize) -> Result<Solid> {
    Solid::slab(MultiPolygon(vec![circle(radius, segments)?]), z_min, height)
}

/// Hollow cylinder standing on `z_min`
pub fn ring(outer_radius: f64, inner_radius: f64, z_min: f64, height: f64, segments: usize) -> Result<Solid> {
    Solid::slab(
        MultiPolygon(vec![annulus(outer_radius, inner_radius, segments)?]),
        z_min,
        height,
    )
}
