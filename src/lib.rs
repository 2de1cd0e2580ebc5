//! Minimum-curvature trajectory optimization over parametric cubic splines.
//!
//! Given a reference centerline and two boundary curves (left/right track
//! edges), the optimizer computes per-control-point lateral displacements
//! along the local normal that minimize integrated path curvature while
//! staying inside the track corridor. The problem is a convex QP solved
//! with OSQP.
//!
//! # Pipeline
//!
//! - `continuity`: the 4N×4N spline-continuity system and its inverse,
//!   mapping displacement variables into cubic coefficients
//! - `objective`: curvature cost as Hessian and gradient in the
//!   displacement variables
//! - `boundary`: per-control-point clearance to each track edge via
//!   kd-tree search over densely sampled boundary curves
//! - `constraints`: clearances turned into box bounds (first point pinned,
//!   last point tapered)
//! - `optimizer`: the `set_up`/`solve` lifecycle tying it together
//!
//! # Usage
//!
//! ```ignore
//! use min_curv::{CubicSpline, MinCurvatureOptimizer, SplineSet};
//!
//! let reference = CubicSpline::new(centerline_points)?;
//! let left = CubicSpline::new(left_edge_points)?;
//! let right = CubicSpline::new(right_edge_points)?;
//!
//! let mut optimizer = MinCurvatureOptimizer::new()?;
//! optimizer.set_up(&SplineSet::new(&reference, &left, &right)?, 1.0)?;
//!
//! let mut optimized = reference.clone();
//! optimizer.solve(&mut optimized, 1.0)?;
//! ```

pub mod boundary;
pub mod constraints;
pub mod continuity;
pub mod error;
pub mod objective;
pub mod optimizer;
pub mod qp;
pub mod spline;
pub mod test_utils;

pub use boundary::BoundaryClearance;
pub use constraints::Bounds;
pub use error::{Error, Result};
pub use objective::Objective;
pub use optimizer::{MinCurvatureOptimizer, MinCurvatureParams, SplineSet};
pub use spline::CubicSpline;
