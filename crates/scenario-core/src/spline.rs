//! Uniform clamped B-spline sampling: the road representation function.

use crate::geometry::{round_to, Point};

/// Decimal places kept on every sampled coordinate.
const PRECISION: i32 = 3;

/// Sample `samples` points on a uniform clamped B-spline through `control`.
///
/// The degree is clamped to `[1, control.len() - 1]`, so two control points
/// always give a straight line. The first and last samples coincide with the
/// first and last control points.
///
/// Panics if fewer than two control points are given.
pub fn b_spline(control: &[Point], samples: usize, degree: usize) -> Vec<Point> {
    assert!(
        control.len() >= 2,
        "b_spline needs at least two control points"
    );
    let count = control.len();
    let degree = degree.clamp(1, count - 1);
    let knots = knot_vector(count, degree);
    let end = (count - degree) as f64;

    (0..samples)
        .map(|i| {
            let u = if samples > 1 {
                end * i as f64 / (samples - 1) as f64
            } else {
                0.0
            };
            round_to(de_boor(control, &knots, degree, u), PRECISION)
        })
        .collect()
}

/// `[0]*k ++ 0..=(n-k) ++ [n-k]*k`
fn knot_vector(count: usize, degree: usize) -> Vec<f64> {
    let inner = count - degree;
    std::iter::repeat_n(0.0, degree)
        .chain((0..=inner).map(|k| k as f64))
        .chain(std::iter::repeat_n(inner as f64, degree))
        .collect()
}

fn de_boor(control: &[Point], knots: &[f64], degree: usize, u: f64) -> Point {
    let count = control.len();
    // Knot span containing u; the right end belongs to the last span.
    let mut span = degree;
    while span < count - 1 && u >= knots[span + 1] {
        span += 1;
    }

    let mut d: Vec<Point> = (0..=degree).map(|j| control[j + span - degree]).collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let left = knots[j + span - degree];
            let right = knots[j + 1 + span - r];
            let alpha = if right > left {
                (u - left) / (right - left)
            } else {
                0.0
            };
            d[j] = [
                (1.0 - alpha) * d[j - 1][0] + alpha * d[j][0],
                (1.0 - alpha) * d[j - 1][1] + alpha * d[j][1],
            ];
        }
    }
    d[degree]
}
