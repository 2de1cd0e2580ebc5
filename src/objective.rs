//! QP objective assembly: curvature cost as a quadratic form in the
//! per-control-point lateral displacements.
//!
//! The decision variables are scalar displacements along each control
//! point's normal. Moving a control point changes the spline coefficients
//! through the continuity-system inverse, and the curvature at a knot is
//! read off the second-derivative coefficient of its segment. Chaining
//! these linear maps gives the transforms
//!
//! ```text
//! T_c  = 2 · A_ex · systemInverse      (coefficient vector → curvature)
//! T_nx = T_c · M_x,  T_ny = T_c · M_y  (displacements → axis curvature)
//! ```
//!
//! where `A_ex` extracts each knot's second-derivative coefficient and
//! `M_x`/`M_y` inject displacements into the knot-value vector through the
//! normal components. The Hessian and gradient then combine these with the
//! diagonal weights `P_xx`, `P_xy`, `P_yy` built from the normal
//! components, decomposing squared curvature into axis and cross terms.

use nalgebra::{DMatrix, DVector, Vector2};

use crate::error::{Error, Result};
use crate::spline::{knot_vector, CubicSpline};

/// Tangents below this norm are treated as degenerate.
const MIN_TANGENT_NORM: f64 = 1e-10;

/// Quadratic and linear terms of the curvature cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Symmetric positive-semidefinite Hessian, N×N.
    pub hessian: DMatrix<f64>,
    /// Linear term, length N.
    pub gradient: DVector<f64>,
}

/// Unit normals at each control point, taken as the perpendicular of the
/// local first-derivative coefficients.
///
/// A zero-length tangent leaves the displacement direction undefined, which
/// means duplicate control points; that is rejected rather than patched.
pub fn normal_vectors(spline: &CubicSpline) -> Result<Vec<Vector2<f64>>> {
    let (coefficients_x, coefficients_y) = spline.coefficients();
    (0..spline.num_control_points())
        .map(|i| {
            let tangent = Vector2::new(coefficients_x[(1, i)], coefficients_y[(1, i)]);
            let norm = tangent.norm();
            if norm < MIN_TANGENT_NORM {
                return Err(Error::DegenerateTangent(i));
            }
            Ok(Vector2::new(-tangent.y, tangent.x) / norm)
        })
        .collect()
}

/// Assemble the Hessian and gradient from the reference geometry.
pub fn assemble(
    spline: &CubicSpline,
    normals: &[Vector2<f64>],
    system_inverse: &DMatrix<f64>,
) -> Objective {
    let n = spline.num_control_points();
    let size = 4 * n;

    let p_xx = DMatrix::from_diagonal(&DVector::from_iterator(
        n,
        normals.iter().map(|v| v.x * v.x),
    ));
    let p_yy = DMatrix::from_diagonal(&DVector::from_iterator(
        n,
        normals.iter().map(|v| v.y * v.y),
    ));
    let p_xy = DMatrix::from_diagonal(&DVector::from_iterator(
        n,
        normals.iter().map(|v| 2.0 * v.x * v.y),
    ));

    // Raw control-point coordinates stacked the way the continuity system
    // expects its right-hand side.
    let points = spline.control_points();
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let q_x = knot_vector(&xs);
    let q_y = knot_vector(&ys);

    // Injection matrices route displacement i into the same rows its knot
    // occupies in q; the extraction matrix picks each knot's
    // second-derivative coefficient.
    let mut m_x = DMatrix::zeros(size, n);
    let mut m_y = DMatrix::zeros(size, n);
    let mut a_ex = DMatrix::zeros(n, size);
    m_x[(0, 0)] = normals[0].x;
    m_x[(2, 1)] = normals[1].x;
    m_y[(0, 0)] = normals[0].y;
    m_y[(2, 1)] = normals[1].y;
    a_ex[(0, 2)] = 1.0;
    for i in 1..n - 1 {
        m_x[(4 * i + 1, i)] = normals[i].x;
        m_x[(4 * i + 2, i + 1)] = normals[i + 1].x;
        m_y[(4 * i + 1, i)] = normals[i].y;
        m_y[(4 * i + 2, i + 1)] = normals[i + 1].y;
        a_ex[(i, 4 * i + 2)] = 1.0;
    }
    m_x[(size - 3, n - 1)] = normals[n - 1].x;
    m_y[(size - 3, n - 1)] = normals[n - 1].y;
    a_ex[(n - 1, size - 2)] = 1.0;

    let t_c = 2.0 * (&a_ex * system_inverse);
    let t_nx = &t_c * &m_x;
    let t_ny = &t_c * &m_y;

    let quadratic = t_nx.transpose() * &p_xx * &t_nx
        + t_ny.transpose() * &p_xy * &t_nx
        + t_ny.transpose() * &p_yy * &t_ny;

    let curvature_x = &t_c * &q_x;
    let curvature_y = &t_c * &q_y;
    let gradient = 2.0 * t_nx.transpose() * &p_xx * &curvature_x
        + t_ny.transpose() * &p_xy * &curvature_x
        + 2.0 * t_ny.transpose() * &p_yy * &curvature_y
        + t_nx.transpose() * &p_xy * &curvature_y;

    // QP solvers expect an exactly symmetric Hessian.
    let hessian = (quadratic.transpose() + &quadratic) * 0.5;

    Objective { hessian, gradient }
}
