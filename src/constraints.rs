//! Box constraints on the lateral displacements.
//!
//! Each decision variable is bounded independently (the QP constraint
//! matrix is the identity): negative displacements move toward the right
//! boundary, positive toward the left. The first control point is pinned at
//! zero, it anchors the trajectory at the current vehicle position. The
//! last point's range is tapered by `last_point_shrink` because the path's
//! continuation beyond the horizon is unknown.

use nalgebra::DVector;

use crate::boundary::BoundaryClearance;
use crate::error::{Error, Result};

/// Lower/upper displacement bounds per control point.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

/// Turn clearances into displacement bounds.
pub fn displacement_bounds(
    clearance: &BoundaryClearance,
    last_point_shrink: f64,
) -> Result<Bounds> {
    if !(0.0..=1.0).contains(&last_point_shrink) {
        return Err(Error::InvalidLastPointShrink(last_point_shrink));
    }

    let mut lower = -clearance.right.clone();
    let mut upper = clearance.left.clone();

    lower[0] = 0.0;
    upper[0] = 0.0;

    let last = lower.len() - 1;
    lower[last] *= last_point_shrink;
    upper[last] *= last_point_shrink;

    Ok(Bounds { lower, upper })
}
