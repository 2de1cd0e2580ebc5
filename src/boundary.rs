//! Lateral free space against the track boundaries.
//!
//! Each boundary spline is densely sampled and indexed in a kd-tree. For a
//! control point the query walks the `num_nearest` Euclidean neighbours and
//! keeps the one closest to the control point's normal line, i.e. the
//! sample most nearly "directly across" the track. Near sharp curves the
//! plain Euclidean nearest sample can sit ahead of or behind the control
//! point and would understate the usable width, so the across-selection is
//! deliberate; the reported clearance is still that sample's Euclidean
//! distance.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use nalgebra::{DVector, Point2, Vector2};

use crate::error::{Error, Result};
use crate::spline::CubicSpline;

/// Bucket size for the boundary kd-trees. Straight boundary segments put
/// many samples on one splitting-axis coordinate, so the mutable tree is
/// used; it splits such buckets where the immutable builder refuses them.
const BUCKET_SIZE: usize = 32;

type BoundaryTree = KdTree<f64, u64, 2, BUCKET_SIZE, u32>;

fn build_tree(samples: &[[f64; 2]]) -> BoundaryTree {
    let mut tree = BoundaryTree::with_capacity(samples.len());
    for (index, sample) in samples.iter().enumerate() {
        tree.add(sample, index as u64);
    }
    tree
}

/// Per-control-point clearance to the left and right boundary, both ≥ 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryClearance {
    pub left: DVector<f64>,
    pub right: DVector<f64>,
}

/// Compute the clearance pair for every control point.
///
/// `num_points_evaluate` samples are taken per boundary at uniform
/// parameters in [0, 1]; `num_nearest` neighbours are considered per query;
/// `shrink_margin` is subtracted from each raw distance (clipped at zero).
pub fn boundary_clearance(
    control_points: &[Point2<f64>],
    normals: &[Vector2<f64>],
    left: &CubicSpline,
    right: &CubicSpline,
    num_points_evaluate: usize,
    num_nearest: usize,
    shrink_margin: f64,
) -> Result<BoundaryClearance> {
    if num_points_evaluate < 2 {
        return Err(Error::TooFewBoundarySamples(num_points_evaluate));
    }
    if num_nearest == 0 || num_nearest > num_points_evaluate {
        return Err(Error::InvalidNeighbourCount {
            requested: num_nearest,
            available: num_points_evaluate,
        });
    }

    let left_points = sample_boundary(left, num_points_evaluate);
    let right_points = sample_boundary(right, num_points_evaluate);
    let left_tree = build_tree(&left_points);
    let right_tree = build_tree(&right_points);

    let n = control_points.len();
    let mut clearance = BoundaryClearance {
        left: DVector::zeros(n),
        right: DVector::zeros(n),
    };
    for (i, (point, normal)) in control_points.iter().zip(normals).enumerate() {
        let raw_left = nearest_across(&left_tree, &left_points, point, normal, num_nearest);
        let raw_right = nearest_across(&right_tree, &right_points, point, normal, num_nearest);
        clearance.left[i] = (raw_left - shrink_margin).max(0.0);
        clearance.right[i] = (raw_right - shrink_margin).max(0.0);
    }
    Ok(clearance)
}

fn sample_boundary(spline: &CubicSpline, num_points: usize) -> Vec<[f64; 2]> {
    (0..num_points)
        .map(|i| {
            let u = i as f64 / (num_points - 1) as f64;
            let point = spline.evaluate(u, 0);
            [point.x, point.y]
        })
        .collect()
}

/// Distance from `point` to the boundary sample best aligned with its
/// normal line, chosen among the `num_nearest` Euclidean neighbours.
///
/// The normal line through the point is `a·x + b·y + c = 0` with
/// `(a, b) = (-normal.y, normal.x)`; candidates are ranked by their
/// perpendicular distance to that line, but the returned value is the
/// winning candidate's Euclidean distance to the point.
pub(crate) fn nearest_across(
    tree: &BoundaryTree,
    samples: &[[f64; 2]],
    point: &Point2<f64>,
    normal: &Vector2<f64>,
    num_nearest: usize,
) -> f64 {
    let a = -normal.y;
    let b = normal.x;
    let norm_factor = (a * a + b * b).sqrt();
    let c = -a * point.x - b * point.y;

    let neighbours = tree.nearest_n::<SquaredEuclidean>(&[point.x, point.y], num_nearest);

    let mut min_line_distance = f64::MAX;
    let mut distance = f64::MAX;
    for neighbour in neighbours {
        let sample = samples[neighbour.item as usize];
        let line_distance = (a * sample[0] + b * sample[1] + c).abs() / norm_factor;
        if line_distance < min_line_distance {
            min_line_distance = line_distance;
            distance = ((sample[0] - point.x).powi(2) + (sample[1] - point.y).powi(2)).sqrt();
        }
    }
    distance
}
