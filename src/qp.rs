//! Box-constrained QP session over the OSQP solver.
//!
//! The problem is `min ½ xᵀHx + cᵀx` subject to `lower ≤ x ≤ upper`, loaded
//! with an identity constraint matrix. Solver internals stay behind the
//! `osqp` crate; this module only converts the dense objective into CSC
//! form, maps settings, and folds the solver status into the crate's error
//! taxonomy. A failed solve yields no solution vector at all, so stale
//! results can never be applied.

use std::borrow::Cow;

use nalgebra::{DMatrix, DVector};
use osqp::{CscMatrix, Problem, Settings, Status};
use tracing::warn;

use crate::error::{Error, Result};

/// Solver settings forwarded to OSQP.
#[derive(Debug, Clone, Copy)]
pub struct QpSettings {
    pub max_iterations: u32,
    pub warm_start: bool,
    pub verbose: bool,
}

/// Solve the box-constrained QP, returning the displacement vector.
pub fn solve_box_qp(
    hessian: &DMatrix<f64>,
    gradient: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    settings: &QpSettings,
) -> Result<Vec<f64>> {
    let n = gradient.len();
    let hessian_csc = dense_to_csc(hessian).into_upper_tri();
    let constraints = identity_csc(n);

    let osqp_settings = Settings::default()
        .verbose(settings.verbose)
        .max_iter(settings.max_iterations)
        .warm_start(settings.warm_start);

    let mut problem = Problem::new(
        hessian_csc,
        gradient.as_slice(),
        constraints,
        lower.as_slice(),
        upper.as_slice(),
        &osqp_settings,
    )
    .map_err(|e| Error::QpSetup(format!("{e:?}")))?;

    match problem.solve() {
        Status::Solved(solution) => Ok(solution.x().to_vec()),
        Status::SolvedInaccurate(solution) => {
            warn!("QP solved to reduced accuracy");
            Ok(solution.x().to_vec())
        }
        Status::MaxIterationsReached(_) => Err(Error::IterationLimit),
        Status::PrimalInfeasible(_) | Status::PrimalInfeasibleInaccurate(_) => {
            Err(Error::Infeasible)
        }
        Status::DualInfeasible(_) | Status::DualInfeasibleInaccurate(_) => Err(Error::Infeasible),
        _ => Err(Error::SolverFailure("unexpected solver status")),
    }
}

/// Convert a dense matrix into CSC form for the solver.
fn dense_to_csc(matrix: &DMatrix<f64>) -> CscMatrix<'static> {
    let rows: Vec<Vec<f64>> = matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    CscMatrix::from(&rows)
}

/// Identity constraint matrix in CSC form.
fn identity_csc(n: usize) -> CscMatrix<'static> {
    CscMatrix {
        nrows: n,
        ncols: n,
        indptr: Cow::Owned((0..=n).collect()),
        indices: Cow::Owned((0..n).collect()),
        data: Cow::Owned(vec![1.0; n]),
    }
}
