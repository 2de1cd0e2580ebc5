//! Synthetic track geometry for tests.
//!
//! Straight and circular-arc corridors with known clearances, so tests can
//! assert against analytic ground truth.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Point2;

/// Control points on a horizontal line `y = offset_y`, spaced `spacing`
/// apart starting at the origin.
pub fn line_points(n: usize, spacing: f64, offset_y: f64) -> Vec<Point2<f64>> {
    (0..n)
        .map(|i| Point2::new(i as f64 * spacing, offset_y))
        .collect()
}

/// Shift a point set laterally (along +y).
pub fn offset_line(points: &[Point2<f64>], offset: f64) -> Vec<Point2<f64>> {
    points
        .iter()
        .map(|p| Point2::new(p.x, p.y + offset))
        .collect()
}

/// Control points on a counterclockwise quarter arc of the given radius,
/// centered at the origin.
///
/// The spline normal `(-tangent.y, tangent.x)` points toward the center
/// for this orientation, so "left of travel" is the inside of the arc.
pub fn arc_points(n: usize, radius: f64) -> Vec<Point2<f64>> {
    offset_arc(n, radius, 0.0)
}

/// Arc control points displaced `offset` along the reference arc's inward
/// normal (its left side): positive offsets shrink the radius.
pub fn offset_arc(n: usize, radius: f64, offset: f64) -> Vec<Point2<f64>> {
    let r = radius - offset;
    (0..n)
        .map(|i| {
            let theta = FRAC_PI_2 * i as f64 / (n - 1) as f64;
            Point2::new(r * theta.cos(), r * theta.sin())
        })
        .collect()
}
