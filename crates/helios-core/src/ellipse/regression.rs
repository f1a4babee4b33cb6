//! Direct least-squares ellipse regression (Halíř & Flusser, 1998).
//!
//! The design matrix is split into its quadratic part `D1 = [x², xy, y²]`
//! and its linear part `D2 = [x, y, 1]`. With `S1 = D1ᵀD1`, `S2 = D1ᵀD2`,
//! `S3 = D2ᵀD2` the constrained problem reduces to the 3×3 eigenproblem
//! `C1⁻¹ (S1 - S2 S3⁻¹ S2ᵀ) a1 = λ a1`, where `C1` encodes `4ac - b² = 1`.
//! The linear coefficients follow as `a2 = -S3⁻¹ S2ᵀ a1`.

use std::f64::consts::{PI, SQRT_2};

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use super::types::{Conic, Ellipse, Point2D};
use crate::consts::MIN_ELLIPSE_SAMPLES;
use crate::error::{HeliosError, Result};

/// Fit an ellipse to `samples`.
///
/// Fails with [`HeliosError::InsufficientData`] when there are fewer than
/// `MIN_ELLIPSE_SAMPLES` points, when the points are degenerate (collinear,
/// coincident) or when the best conic is not a real ellipse.
pub fn fit_ellipse_regression(samples: &[Point2D]) -> Result<Ellipse> {
    let insufficient = || HeliosError::InsufficientData {
        needed: MIN_ELLIPSE_SAMPLES,
        got: samples.len(),
    };

    if samples.len() < MIN_ELLIPSE_SAMPLES {
        return Err(insufficient());
    }

    let conic = fit_conic(samples).ok_or_else(insufficient)?;
    let ellipse = conic.to_ellipse().ok_or_else(insufficient)?;

    debug!(
        cx = ellipse.center.x,
        cy = ellipse.center.y,
        a = ellipse.semi_axis_a,
        b = ellipse.semi_axis_b,
        rotation = ellipse.rotation,
        samples = samples.len(),
        "Ellipse regression"
    );
    Ok(ellipse)
}

/// Solve the reduced scatter system for the conic coefficients.
pub(crate) fn fit_conic(samples: &[Point2D]) -> Option<Conic> {
    let (mean_x, mean_y, scale) = normalization_params(samples)?;

    let mut s1 = Matrix3::<f64>::zeros();
    let mut s2 = Matrix3::<f64>::zeros();
    let mut s3 = Matrix3::<f64>::zeros();
    for p in samples {
        let x = (p.x - mean_x) * scale;
        let y = (p.y - mean_y) * scale;
        let quad = Vector3::new(x * x, x * y, y * y);
        let lin = Vector3::new(x, y, 1.0);
        s1 += quad * quad.transpose();
        s2 += quad * lin.transpose();
        s3 += lin * lin.transpose();
    }

    let s3_inv = s3.try_inverse()?;
    let t = -s3_inv * s2.transpose();
    let m = s1 + s2 * t;

    // C1⁻¹ M, with C1 = [[0, 0, 2], [0, -1, 0], [2, 0, 0]].
    let reduced = Matrix3::new(
        m[(2, 0)] / 2.0,
        m[(2, 1)] / 2.0,
        m[(2, 2)] / 2.0,
        -m[(1, 0)],
        -m[(1, 1)],
        -m[(1, 2)],
        m[(0, 0)] / 2.0,
        m[(0, 1)] / 2.0,
        m[(0, 2)] / 2.0,
    );

    let a1 = ellipse_eigenvector(&reduced)?;
    let a2 = t * a1;

    let normalized = [a1[0], a1[1], a1[2], a2[0], a2[1], a2[2]];
    Some(denormalize(&normalized, mean_x, mean_y, scale))
}

/// Shift to the centroid and scale so the mean distance to it is √2.
fn normalization_params(samples: &[Point2D]) -> Option<(f64, f64, f64)> {
    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|p| p.x).sum::<f64>() / n;
    let mean_y = samples.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = samples
        .iter()
        .map(|p| (p.x - mean_x).hypot(p.y - mean_y))
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return None;
    }
    let scale = SQRT_2 / mean_dist;

    // Collinear points have a singular covariance.
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in samples {
        let x = (p.x - mean_x) * scale;
        let y = (p.y - mean_y) * scale;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
    }
    if (sxx * syy - sxy * sxy) / (n * n) < 1e-10 {
        return None;
    }

    Some((mean_x, mean_y, scale))
}

/// Map a conic fitted on `x' = s (x - mx)`, `y' = s (y - my)` back to
/// image coordinates.
fn denormalize(c: &[f64; 6], mx: f64, my: f64, s: f64) -> Conic {
    let [a, b, cc, d, e, f] = *c;
    let s2 = s * s;
    Conic([
        a * s2,
        b * s2,
        cc * s2,
        -2.0 * a * s2 * mx - b * s2 * my + d * s,
        -b * s2 * mx - 2.0 * cc * s2 * my + e * s,
        a * s2 * mx * mx + b * s2 * mx * my + cc * s2 * my * my - d * s * mx - e * s * my + f,
    ])
}

/// Eigenvector of `system` satisfying the ellipse constraint `4ac - b² > 0`.
fn ellipse_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let a = system;
    let trace = a.trace();
    let minor_sum = a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)] + a[(0, 0)] * a[(2, 2)]
        - a[(0, 2)] * a[(2, 0)]
        + a[(1, 1)] * a[(2, 2)]
        - a[(1, 2)] * a[(2, 1)];
    let det = a.determinant();

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for lambda in solve_cubic_real(-trace, minor_sum, -det) {
        let shifted = system - Matrix3::identity() * lambda;
        let Some(v) = null_vector(&shifted) else {
            continue;
        };
        let constraint = 4.0 * v[0] * v[2] - v[1] * v[1];
        if constraint > 0.0 && best.as_ref().map_or(true, |(l, _)| lambda.abs() < *l) {
            best = Some((lambda.abs(), v));
        }
    }
    best.map(|(_, v)| v)
}

/// Null vector of a rank-2 matrix: the cofactor row with the largest norm.
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [
        Vector3::new(
            m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)],
            -(m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)]),
            m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)],
        ),
        Vector3::new(
            -(m[(0, 1)] * m[(2, 2)] - m[(0, 2)] * m[(2, 1)]),
            m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)],
            -(m[(0, 0)] * m[(2, 1)] - m[(0, 1)] * m[(2, 0)]),
        ),
        Vector3::new(
            m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)],
            -(m[(0, 0)] * m[(1, 2)] - m[(0, 2)] * m[(1, 0)]),
            m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        ),
    ];

    let best = rows
        .iter()
        .max_by(|l, r| l.norm_squared().total_cmp(&r.norm_squared()))?;
    let norm = best.norm();
    if norm < 1e-15 {
        return None;
    }
    Some(best / norm)
}

/// Real roots of `x³ + b x² + c x + d = 0`.
fn solve_cubic_real(b: f64, c: f64, d: f64) -> Vec<f64> {
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;
    let disc = -4.0 * p * p * p - 27.0 * q * q;

    if disc >= 0.0 {
        let r = (-p / 3.0).max(0.0).sqrt();
        let cos_arg = if r < 1e-15 {
            0.0
        } else {
            (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0)
        };
        let theta = cos_arg.acos();
        (0..3)
            .map(|k| 2.0 * r * ((theta + 2.0 * PI * k as f64) / 3.0).cos() + shift)
            .collect()
    } else {
        let sqrt_disc = (q * q / 4.0 + p * p * p / 27.0).sqrt();
        let u = (-q / 2.0 + sqrt_disc).cbrt();
        let v = (-q / 2.0 - sqrt_disc).cbrt();
        vec![u + v + shift]
    }
}
