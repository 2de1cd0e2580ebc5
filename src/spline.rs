//! Parametric natural cubic spline over ordered 2D control points.
//!
//! Each pair of adjacent control points is joined by a cubic
//! `a + b·t + c·t² + d·t³` on local `t ∈ [0, 1]`; the coefficients come
//! from solving the continuity system against the stacked knot values, so
//! the curve interpolates its control points with continuous first and
//! second derivatives and zero second derivative at both ends.
//!
//! Coefficients are exposed as two 4×N matrices (row = polynomial order,
//! column = segment), one per axis. The curve is evaluated at a single
//! normalized parameter `u ∈ [0, 1]` spanning the whole path.

use nalgebra::{DMatrix, DVector, Point2, Vector2};

use crate::continuity;
use crate::error::{Error, Result};

/// A 2D natural cubic spline.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    control_points: Vec<Point2<f64>>,
    coefficients_x: DMatrix<f64>,
    coefficients_y: DMatrix<f64>,
}

impl CubicSpline {
    /// Fit a spline through the given control points (at least two).
    pub fn new(control_points: Vec<Point2<f64>>) -> Result<Self> {
        let (coefficients_x, coefficients_y) = fit(&control_points)?;
        Ok(Self {
            control_points,
            coefficients_x,
            coefficients_y,
        })
    }

    /// Number of control points, always at least two.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// The ordered control points defining the curve.
    pub fn control_points(&self) -> &[Point2<f64>] {
        &self.control_points
    }

    /// Per-axis coefficient matrices `(x, y)`, each 4×N with rows =
    /// polynomial order 0..3 and columns = segment index.
    pub fn coefficients(&self) -> (&DMatrix<f64>, &DMatrix<f64>) {
        (&self.coefficients_x, &self.coefficients_y)
    }

    /// Evaluate the curve (or one of its parameter derivatives) at
    /// `u ∈ [0, 1]`. `u` is clamped to the valid range. Derivatives above
    /// order three vanish.
    pub fn evaluate(&self, u: f64, derivative: usize) -> Vector2<f64> {
        let n = self.control_points.len();
        let s = u.clamp(0.0, 1.0) * (n - 1) as f64;
        let segment = (s.floor() as usize).min(n - 2);
        let t = s - segment as f64;

        let eval = |coeffs: &DMatrix<f64>| {
            let a = coeffs[(0, segment)];
            let b = coeffs[(1, segment)];
            let c = coeffs[(2, segment)];
            let d = coeffs[(3, segment)];
            match derivative {
                0 => a + t * (b + t * (c + t * d)),
                1 => b + t * (2.0 * c + t * 3.0 * d),
                2 => 2.0 * c + 6.0 * d * t,
                3 => 6.0 * d,
                _ => 0.0,
            }
        };

        Vector2::new(eval(&self.coefficients_x), eval(&self.coefficients_y))
    }

    /// Replace the control points and refit the coefficients in place.
    pub fn set_control_points(&mut self, control_points: Vec<Point2<f64>>) -> Result<()> {
        let (coefficients_x, coefficients_y) = fit(&control_points)?;
        self.control_points = control_points;
        self.coefficients_x = coefficients_x;
        self.coefficients_y = coefficients_y;
        Ok(())
    }
}

/// Stack per-axis knot values into the continuity system's right-hand side:
/// each segment's value rows carry its start and end knot, all derivative
/// and boundary rows are zero.
pub(crate) fn knot_vector(values: &[f64]) -> DVector<f64> {
    let n = values.len();
    let mut q = DVector::zeros(4 * n);
    q[0] = values[0];
    q[2] = values[1];
    for i in 1..n - 1 {
        q[4 * i + 1] = values[i];
        q[4 * i + 2] = values[i + 1];
    }
    q[4 * n - 3] = values[n - 1];
    q
}

fn fit(control_points: &[Point2<f64>]) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let n = control_points.len();
    let system = continuity::system_matrix(n)?;
    let lu = system.lu();

    let solve_axis = |values: &[f64]| -> Result<DMatrix<f64>> {
        let stacked = lu
            .solve(&knot_vector(values))
            .ok_or(Error::SingularSystem)?;
        Ok(DMatrix::from_fn(4, n, |order, segment| {
            stacked[4 * segment + order]
        }))
    };

    let xs: Vec<f64> = control_points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = control_points.iter().map(|p| p.y).collect();
    let coefficients_x = solve_axis(&xs)?;
    let coefficients_y = solve_axis(&ys)?;
    Ok((coefficients_x, coefficients_y))
}
