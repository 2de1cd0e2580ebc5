//! Error types for the minimum-curvature optimizer.
//!
//! Two failure families are distinguished: contract violations (bad inputs
//! or misuse of the `set_up`/`solve` lifecycle) and numerical failures
//! (singular continuity system, QP infeasibility or iteration exhaustion).
//! Numerical failures leave the output spline untouched; the caller decides
//! whether to relax bounds and retry.

use thiserror::Error;

/// Errors from spline construction and trajectory optimization.
#[derive(Error, Debug)]
pub enum Error {
    #[error("spline needs at least {min} control points, got {got}")]
    TooFewControlPoints { min: usize, got: usize },

    #[error("control point counts differ: reference {reference}, left {left}, right {right}")]
    SplineSizeMismatch {
        reference: usize,
        left: usize,
        right: usize,
    },

    #[error("degenerate tangent at control point {0}; duplicate control points are not supported")]
    DegenerateTangent(usize),

    #[error("continuity system is singular")]
    SingularSystem,

    #[error("num_points_evaluate must be at least 2, got {0}")]
    TooFewBoundarySamples(usize),

    #[error("num_nearest ({requested}) must be between 1 and the boundary sample count ({available})")]
    InvalidNeighbourCount { requested: usize, available: usize },

    #[error("last_point_shrink must lie in [0, 1], got {0}")]
    InvalidLastPointShrink(f64),

    #[error("solve called before set_up")]
    NotPrepared,

    #[error("QP setup rejected the problem: {0}")]
    QpSetup(String),

    #[error("QP problem is infeasible")]
    Infeasible,

    #[error("QP iteration limit reached before convergence")]
    IterationLimit,

    #[error("QP solver failed: {0}")]
    SolverFailure(&'static str),
}

impl Error {
    /// Whether the error is a numerical solve failure rather than a
    /// contract violation. Retrying with relaxed bounds only makes sense
    /// for these.
    pub fn is_solve_failure(&self) -> bool {
        matches!(
            self,
            Error::SingularSystem
                | Error::QpSetup(_)
                | Error::Infeasible
                | Error::IterationLimit
                | Error::SolverFailure(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
