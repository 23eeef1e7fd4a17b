//! Ordinary least squares for a straight line

use crate::physics::math::{Matrix2, Scalar, Vector2};

/// `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: Scalar,
    pub slope: Scalar,
}

/// Least-squares line through `(x_i, y_i)` from the normal equations of the
/// design `[1, x]`.
///
/// `x` is centered on its mean before forming the normal equations, which
/// keeps them well conditioned for inputs such as nanosecond time stamps.
/// Returns `None` when the inputs differ in length, hold fewer than two
/// points or all share the same `x`.
pub fn fit_line(x: &[Scalar], y: &[Scalar]) -> Option<LinearFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as Scalar;
    let x_mean = x.iter().sum::<Scalar>() / n;

    let mut gtg = Matrix2::ZERO;
    let mut gty = Vector2::ZERO;
    for (&xi, &yi) in x.iter().zip(y) {
        let row = Vector2::new(1.0, xi - x_mean);
        gtg += Matrix2::from_cols(row * row.x, row * row.y);
        gty += row * yi;
    }

    let determinant = gtg.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return None;
    }

    let coefficients = gtg.inverse() * gty;
    Some(LinearFit {
        intercept: coefficients.x - coefficients.y * x_mean,
        slope: coefficients.y,
    })
}
