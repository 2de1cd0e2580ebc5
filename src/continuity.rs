//! Cubic-segment continuity system.
//!
//! A path through N control points is modelled as N cubic segments, each
//! with four unknown coefficients `a + b·t + c·t² + d·t³` on local
//! `t ∈ [0, 1]` (the final segment is degenerate and only anchors the last
//! point). The 4N×4N system ties adjacent segments together:
//!
//! - value rows: a segment starts at its control point and ends at the next,
//! - first-derivative rows: `b_i + 2c_i + 3d_i = b_{i+1}`,
//! - second-derivative rows: `c_i + 3d_i = c_{i+1}`,
//! - natural boundary rows: zero second derivative at both ends.
//!
//! The inverse is consumed as a dense linear operator by the objective
//! assembly, so it is computed explicitly rather than kept as a
//! factorization.

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Build the 4N×4N continuity system for `num_control_points` knots.
///
/// Requires at least two control points; fewer leaves no segment to
/// constrain.
pub fn system_matrix(num_control_points: usize) -> Result<DMatrix<f64>> {
    if num_control_points < 2 {
        return Err(Error::TooFewControlPoints {
            min: 2,
            got: num_control_points,
        });
    }

    let size = 4 * num_control_points;
    let mut system = DMatrix::zeros(size, size);

    // First segment: value at start, natural start (2c₀ = 0), value at end,
    // then derivative coupling into segment 1.
    system[(0, 0)] = 1.0;
    system[(1, 2)] = 2.0;
    system[(2, 0)] = 1.0;
    system[(2, 1)] = 1.0;
    system[(2, 2)] = 1.0;
    system[(2, 3)] = 1.0;
    system[(3, 1)] = 1.0;
    system[(3, 2)] = 2.0;
    system[(3, 3)] = 3.0;
    system[(3, 5)] = -1.0;
    system[(4, 2)] = 1.0;
    system[(4, 3)] = 3.0;
    system[(4, 6)] = -1.0;

    // Interior segments: value rows plus derivative coupling at column
    // offsets +5 and +6 from the segment base column 4i.
    for i in 1..num_control_points - 1 {
        let base = 4 * i;
        system[(base + 1, base)] = 1.0;
        system[(base + 2, base)] = 1.0;
        system[(base + 2, base + 1)] = 1.0;
        system[(base + 2, base + 2)] = 1.0;
        system[(base + 2, base + 3)] = 1.0;
        system[(base + 3, base + 1)] = 1.0;
        system[(base + 3, base + 2)] = 2.0;
        system[(base + 3, base + 3)] = 3.0;
        system[(base + 3, base + 5)] = -1.0;
        system[(base + 4, base + 2)] = 1.0;
        system[(base + 4, base + 3)] = 3.0;
        system[(base + 4, base + 6)] = -1.0;
    }

    // Last (degenerate) segment: anchor the final point, natural end.
    system[(size - 3, size - 4)] = 1.0;
    system[(size - 2, size - 2)] = 2.0;
    system[(size - 1, size - 1)] = 1.0;

    Ok(system)
}

/// Compute the explicit inverse of the continuity system.
///
/// The system is structurally non-singular for N ≥ 2, so a failed
/// factorization indicates a broken invariant rather than bad user input.
pub fn system_inverse(num_control_points: usize) -> Result<DMatrix<f64>> {
    let system = system_matrix(num_control_points)?;
    system.lu().try_inverse().ok_or(Error::SingularSystem)
}
