//! Minimum-curvature trajectory optimizer.
//!
//! Orchestrates one optimization pass: normals and curvature objective from
//! the reference spline, clearance bounds from the boundary splines, then a
//! box-constrained QP whose solution displaces each control point along its
//! normal. `set_up` must precede `solve`; the input splines are only
//! borrowed for the duration of one pass and never mutated, the optimized
//! control points are written into a caller-supplied output spline.
//!
//! # Usage
//!
//! ```ignore
//! use min_curv::{CubicSpline, MinCurvatureOptimizer, SplineSet};
//!
//! let mut optimizer = MinCurvatureOptimizer::new()?;
//! let splines = SplineSet::new(&reference, &left, &right)?;
//! optimizer.set_up(&splines, 1.0)?;
//!
//! let mut optimized = reference.clone();
//! optimizer.solve(&mut optimized, 1.0)?;
//! ```

use std::time::Instant;

use nalgebra::{DMatrix, DVector, Point2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary;
use crate::constraints::{self, Bounds};
use crate::continuity;
use crate::error::{Error, Result};
use crate::objective;
use crate::qp::{self, QpSettings};
use crate::spline::CubicSpline;

/// Static knobs of the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinCurvatureParams {
    /// Expected control-point count; only used to precompute the system
    /// inverse when `constant_system_matrix` is set.
    pub num_control_points: usize,

    /// Whether the control-point count stays fixed across passes. When set,
    /// the continuity-system inverse is computed once at construction and
    /// reused.
    pub constant_system_matrix: bool,

    /// Iteration cap for the QP solver.
    pub max_iterations: u32,

    /// Whether the QP solver warm-starts from the previous iterate.
    pub warm_start: bool,

    /// Enables solver output and timing diagnostics.
    pub verbose: bool,

    /// Samples taken per boundary spline when estimating clearance.
    pub num_points_evaluate: usize,

    /// Euclidean neighbours considered per clearance query.
    pub num_nearest: usize,

    /// Safety buffer subtracted from each raw boundary distance.
    pub shrink_margin: f64,
}

impl Default for MinCurvatureParams {
    fn default() -> Self {
        Self {
            num_control_points: 20,
            constant_system_matrix: false,
            max_iterations: 4000,
            warm_start: true,
            verbose: false,
            num_points_evaluate: 100,
            num_nearest: 3,
            shrink_margin: 0.0,
        }
    }
}

/// The three input curves of one optimization pass.
///
/// Construction checks that all splines carry the same number of control
/// points; mismatched sizes are a contract violation.
#[derive(Debug, Clone, Copy)]
pub struct SplineSet<'a> {
    pub reference: &'a CubicSpline,
    pub left: &'a CubicSpline,
    pub right: &'a CubicSpline,
}

impl<'a> SplineSet<'a> {
    pub fn new(
        reference: &'a CubicSpline,
        left: &'a CubicSpline,
        right: &'a CubicSpline,
    ) -> Result<Self> {
        if reference.num_control_points() != left.num_control_points() || reference.num_control_points() != right.num_control_points() {
            return Err(Error::SplineSizeMismatch {
                reference: reference.num_control_points(),
                left: left.num_control_points(),
                right: right.num_control_points(),
            });
        }
        Ok(Self {
            reference,
            left,
            right,
        })
    }
}

/// Continuity-system inverse cached for a fixed control-point count.
#[derive(Debug, Clone)]
struct CachedInverse {
    num_control_points: usize,
    inverse: DMatrix<f64>,
}

/// Assembled problem state carried from `set_up` to `solve`.
#[derive(Debug, Clone, PartialEq)]
struct Prepared {
    hessian: DMatrix<f64>,
    gradient: DVector<f64>,
    bounds: Bounds,
    normals: Vec<Vector2<f64>>,
    control_points: Vec<Point2<f64>>,
}

/// Minimum-curvature trajectory optimizer.
///
/// One instance owns its working matrices and is not meant for concurrent
/// use; independent instances are fully independent.
#[derive(Debug)]
pub struct MinCurvatureOptimizer {
    params: MinCurvatureParams,
    cached_inverse: Option<CachedInverse>,
    prepared: Option<Prepared>,
}

impl MinCurvatureOptimizer {
    /// Create an optimizer with default parameters.
    pub fn new() -> Result<Self> {
        Self::with_params(MinCurvatureParams::default())
    }

    /// Create an optimizer with the given parameters. When
    /// `constant_system_matrix` is set, the continuity-system inverse for
    /// `num_control_points` is computed here.
    pub fn with_params(params: MinCurvatureParams) -> Result<Self> {
        let cached_inverse = if params.constant_system_matrix {
            Some(CachedInverse {
                num_control_points: params.num_control_points,
                inverse: continuity::system_inverse(params.num_control_points)?,
            })
        } else {
            None
        };
        Ok(Self {
            params,
            cached_inverse,
            prepared: None,
        })
    }

    pub fn params(&self) -> &MinCurvatureParams {
        &self.params
    }

    /// Assemble the QP for the given splines.
    ///
    /// Clears any previously prepared problem, recomputes normals, the
    /// curvature objective and the clearance bounds, and stores them for
    /// `solve`. Pure in its inputs: identical geometry and configuration
    /// produce identical problem data.
    pub fn set_up(&mut self, splines: &SplineSet<'_>, last_point_shrink: f64) -> Result<()> {
        let start = Instant::now();
        self.prepared = None;

        let reference = splines.reference;
        let normals = objective::normal_vectors(reference)?;

        let system_inverse = self.system_inverse_for(reference.num_control_points())?;
        let objective = objective::assemble(reference, &normals, system_inverse);

        let clearance = boundary::boundary_clearance(
            reference.control_points(),
            &normals,
            splines.left,
            splines.right,
            self.params.num_points_evaluate,
            self.params.num_nearest,
            self.params.shrink_margin,
        )?;
        let bounds = constraints::displacement_bounds(&clearance, last_point_shrink)?;

        self.prepared = Some(Prepared {
            hessian: objective.hessian,
            gradient: objective.gradient,
            bounds,
            normals,
            control_points: reference.control_points().to_vec(),
        });

        debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "minimum-curvature QP assembled"
        );
        Ok(())
    }

    /// Solve the prepared QP and write the optimized control points into
    /// `output`.
    ///
    /// The raw solution is scaled uniformly by `normal_weight` before the
    /// control points are rebuilt as `point + displacement · normal`. On
    /// any solver failure `output` is left untouched.
    pub fn solve(&mut self, output: &mut CubicSpline, normal_weight: f64) -> Result<()> {
        let prepared = self.prepared.as_ref().ok_or(Error::NotPrepared)?;

        let start = Instant::now();
        let solution = qp::solve_box_qp(
            &prepared.hessian,
            &prepared.gradient,
            &prepared.bounds.lower,
            &prepared.bounds.upper,
            &QpSettings {
                max_iterations: self.params.max_iterations,
                warm_start: self.params.warm_start,
                verbose: self.params.verbose,
            },
        )?;
        debug!(
            elapsed_us = start.elapsed().as_secs_f64() * 1e6,
            "minimum-curvature QP solved"
        );

        let optimized: Vec<Point2<f64>> = prepared
            .control_points
            .iter()
            .zip(&prepared.normals)
            .zip(&solution)
            .map(|((point, normal), displacement)| {
                Point2::from(point.coords + normal * (normal_weight * displacement))
            })
            .collect();
        output.set_control_points(optimized)
    }

    /// Return the system inverse for `num_control_points`, recomputing and
    /// recaching it when the cached one was built for a different count.
    fn system_inverse_for(&mut self, num_control_points: usize) -> Result<&DMatrix<f64>> {
        let cache = match self.cached_inverse.take() {
            Some(cache) if cache.num_control_points == num_control_points => cache,
            _ => CachedInverse {
                num_control_points,
                inverse: continuity::system_inverse(num_control_points)?,
            },
        };
        Ok(&self.cached_inverse.insert(cache).inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{arc_points, line_points, offset_arc, offset_line};
    use approx::assert_relative_eq;

    fn straight_corridor() -> (CubicSpline, CubicSpline, CubicSpline) {
        let reference = line_points(4, 1.0, 0.0);
        let left = CubicSpline::new(offset_line(&reference, 2.0)).unwrap();
        let right = CubicSpline::new(offset_line(&reference, -2.0)).unwrap();
        (CubicSpline::new(reference).unwrap(), left, right)
    }

    fn arc_corridor() -> (CubicSpline, CubicSpline, CubicSpline) {
        let reference = arc_points(8, 10.0);
        let left = CubicSpline::new(offset_arc(8, 10.0, 2.0)).unwrap();
        let right = CubicSpline::new(offset_arc(8, 10.0, -2.0)).unwrap();
        (CubicSpline::new(reference).unwrap(), left, right)
    }

    #[test]
    fn test_collinear_reference_is_left_unchanged() {
        // A straight line already has zero curvature; the optimizer must
        // not move it even though the corridor leaves room.
        let (reference, left, right) = straight_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();

        let mut optimized = reference.clone();
        optimizer.solve(&mut optimized, 1.0).unwrap();

        for (before, after) in reference
            .control_points()
            .iter()
            .zip(optimized.control_points())
        {
            assert_relative_eq!(before.x, after.x, epsilon = 1e-4);
            assert_relative_eq!(before.y, after.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_first_point_never_moves() {
        let (reference, left, right) = arc_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();

        let prepared = optimizer.prepared.as_ref().unwrap();
        assert_eq!(prepared.bounds.lower[0], 0.0);
        assert_eq!(prepared.bounds.upper[0], 0.0);

        let mut optimized = reference.clone();
        optimizer.solve(&mut optimized, 1.0).unwrap();
        let first = reference.control_points()[0];
        let moved = optimized.control_points()[0];
        assert_relative_eq!(first.x, moved.x, epsilon = 1e-6);
        assert_relative_eq!(first.y, moved.y, epsilon = 1e-6);
    }

    #[test]
    fn test_arc_objective_improves() {
        let (reference, left, right) = arc_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();

        let prepared = optimizer.prepared.clone().unwrap();
        let mut optimized = reference.clone();
        optimizer.solve(&mut optimized, 1.0).unwrap();

        // Zero displacement is always feasible, so the optimum can only
        // lower the cost below the zero baseline.
        let displacement = DVector::from_iterator(
            reference.num_control_points(),
            reference
                .control_points()
                .iter()
                .zip(optimized.control_points())
                .zip(&prepared.normals)
                .map(|((before, after), normal)| (after - before).dot(normal)),
        );
        let cost = 0.5 * (displacement.transpose() * &prepared.hessian * &displacement)[(0, 0)]
            + prepared.gradient.dot(&displacement);
        assert!(cost <= 1e-6, "optimized cost {cost} above zero baseline");

        // An arc inside a wide corridor can be flattened, so some interior
        // point must actually move.
        let max_move = displacement.iter().map(|d| d.abs()).fold(0.0, f64::max);
        assert!(max_move > 1e-2, "expected a nonzero displacement");
    }

    #[test]
    fn test_solution_stays_inside_corridor_bounds() {
        let (reference, left, right) = arc_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();
        let prepared = optimizer.prepared.clone().unwrap();

        let mut optimized = reference.clone();
        optimizer.solve(&mut optimized, 1.0).unwrap();

        for (i, (before, after)) in reference
            .control_points()
            .iter()
            .zip(optimized.control_points())
            .enumerate()
        {
            let displacement = (after - before).dot(&prepared.normals[i]);
            assert!(displacement >= prepared.bounds.lower[i] - 1e-3);
            assert!(displacement <= prepared.bounds.upper[i] + 1e-3);
        }
    }

    #[test]
    fn test_solve_before_set_up_is_rejected() {
        let (reference, _, _) = straight_corridor();
        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        let mut output = reference.clone();
        assert!(matches!(
            optimizer.solve(&mut output, 1.0),
            Err(Error::NotPrepared)
        ));
    }

    #[test]
    fn test_mismatched_spline_sizes_are_rejected() {
        let (reference, left, _) = straight_corridor();
        let short = CubicSpline::new(line_points(3, 1.0, -2.0)).unwrap();
        assert!(matches!(
            SplineSet::new(&reference, &left, &short),
            Err(Error::SplineSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_set_up_is_idempotent() {
        let (reference, left, right) = arc_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        optimizer.set_up(&splines, 0.5).unwrap();
        let first = optimizer.prepared.clone().unwrap();
        optimizer.set_up(&splines, 0.5).unwrap();
        let second = optimizer.prepared.clone().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_solve_leaves_output_untouched() {
        let (reference, left, right) = arc_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        // One iteration cannot converge on a curved problem.
        let mut optimizer = MinCurvatureOptimizer::with_params(MinCurvatureParams {
            max_iterations: 1,
            ..Default::default()
        })
        .unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();

        let sentinel = line_points(8, 1.0, 7.0);
        let mut output = CubicSpline::new(sentinel.clone()).unwrap();
        let result = optimizer.solve(&mut output, 1.0);
        assert!(result.is_err());
        assert_eq!(output.control_points(), sentinel.as_slice());
    }

    #[test]
    fn test_cached_inverse_follows_control_point_count() {
        let mut optimizer = MinCurvatureOptimizer::with_params(MinCurvatureParams {
            constant_system_matrix: true,
            num_control_points: 4,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            optimizer.cached_inverse.as_ref().unwrap().num_control_points,
            4
        );

        // A pass over a different point count invalidates and replaces it.
        let reference = CubicSpline::new(arc_points(6, 10.0)).unwrap();
        let left = CubicSpline::new(offset_arc(6, 10.0, 2.0)).unwrap();
        let right = CubicSpline::new(offset_arc(6, 10.0, -2.0)).unwrap();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();
        assert_eq!(
            optimizer.cached_inverse.as_ref().unwrap().num_control_points,
            6
        );
    }

    #[test]
    fn test_normal_weight_damps_displacement() {
        let (reference, left, right) = arc_corridor();
        let splines = SplineSet::new(&reference, &left, &right).unwrap();

        let mut optimizer = MinCurvatureOptimizer::new().unwrap();
        optimizer.set_up(&splines, 1.0).unwrap();
        let prepared = optimizer.prepared.clone().unwrap();

        let mut full = reference.clone();
        optimizer.solve(&mut full, 1.0).unwrap();
        let mut damped = reference.clone();
        optimizer.solve(&mut damped, 0.5).unwrap();

        for i in 0..reference.num_control_points() {
            let before = reference.control_points()[i];
            let full_d = (full.control_points()[i] - before).dot(&prepared.normals[i]);
            let damped_d = (damped.control_points()[i] - before).dot(&prepared.normals[i]);
            assert_relative_eq!(damped_d, 0.5 * full_d, epsilon = 1e-6);
        }
    }
}
