//! Geometric circle fit in the transverse plane
//!
//! Minimizes `Σ (R_i - mean R)²` over the center, where `R_i` is the distance
//! of point `i` to the center, with Levenberg-Marquardt iterations started at
//! the centroid. The radius is the mean distance at the optimum.

use crate::physics::math::{Matrix2, Scalar, Vector2};

const MAX_ITERATIONS: usize = 200;
/// Relative tolerance on the center update
const XTOL: Scalar = 1.49e-8;
const INITIAL_DAMPING: Scalar = 1e-3;
const MAX_DAMPING: Scalar = 1e16;

/// Result of a circle fit
#[derive(Debug, Clone, PartialEq)]
pub struct CircleFit {
    pub center: Vector2,
    pub radius: Scalar,
    /// Distance of each point to the fitted center
    pub radii: Vec<Scalar>,
    /// `Σ (R_i - radius)²`, a fit-quality diagnostic
    pub residual_sum_squares: Scalar,
    pub iterations: usize,
    pub converged: bool,
}

impl CircleFit {
    /// Per-point deviation from the fitted radius
    pub fn residuals(&self) -> impl Iterator<Item = Scalar> + '_ {
        self.radii.iter().map(move |r| r - self.radius)
    }

    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite()
    }
}

fn distances(center: Vector2, points: &[Vector2]) -> Vec<Scalar> {
    points
        .iter()
        .map(|point| libm::hypot(point.x - center.x, point.y - center.y))
        .collect()
}

fn mean(values: &[Scalar]) -> Scalar {
    values.iter().sum::<Scalar>() / values.len() as Scalar
}

fn cost(radii: &[Scalar]) -> Scalar {
    let radius = mean(radii);
    radii.iter().map(|r| (r - radius).powi(2)).sum()
}

/// Normal equations `JᵀJ` and gradient `Jᵀr` of the radius residuals
fn normal_equations(center: Vector2, points: &[Vector2], radii: &[Scalar]) -> (Matrix2, Vector2) {
    let gradients: Vec<Vector2> = points
        .iter()
        .zip(radii)
        .map(|(point, &r)| {
            if r > 0.0 {
                (center - *point) / r
            } else {
                Vector2::ZERO
            }
        })
        .collect();
    let mean_gradient = gradients.iter().copied().sum::<Vector2>() / points.len() as Scalar;
    let radius = mean(radii);

    let mut jtj = Matrix2::ZERO;
    let mut jtr = Vector2::ZERO;
    for (gradient, &r) in gradients.iter().zip(radii) {
        let row = *gradient - mean_gradient;
        jtj += Matrix2::from_cols(row * row.x, row * row.y);
        jtr += row * (r - radius);
    }
    (jtj, jtr)
}

/// Fit a circle through `points`.
///
/// Needs at least three points for a meaningful result; with fewer the
/// returned fit is degenerate. The caller checks finiteness.
pub fn fit_circle(points: &[Vector2]) -> CircleFit {
    if points.is_empty() {
        return CircleFit {
            center: Vector2::splat(Scalar::NAN),
            radius: Scalar::NAN,
            radii: Vec::new(),
            residual_sum_squares: Scalar::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut center = points.iter().copied().sum::<Vector2>() / points.len() as Scalar;
    let mut radii = distances(center, points);
    let mut current_cost = cost(&radii);
    let mut damping = INITIAL_DAMPING;
    let mut converged = current_cost == 0.0;
    let mut iterations = 0;

    while !converged && iterations < MAX_ITERATIONS {
        iterations += 1;
        let (jtj, jtr) = normal_equations(center, points, &radii);

        let mut improved = false;
        while damping <= MAX_DAMPING {
            let diagonal = Vector2::new(jtj.x_axis.x, jtj.y_axis.y);
            let damped = jtj + Matrix2::from_diagonal(diagonal * damping);
            let determinant = damped.determinant();
            if determinant == 0.0 || !determinant.is_finite() {
                damping *= 10.0;
                continue;
            }

            let delta = -(damped.inverse() * jtr);
            let candidate = center + delta;
            let candidate_radii = distances(candidate, points);
            let candidate_cost = cost(&candidate_radii);

            if candidate_cost.is_finite() && candidate_cost <= current_cost {
                let step_small = delta.length() <= XTOL * (center.length() + XTOL);
                let cost_small = current_cost - candidate_cost <= XTOL * current_cost;

                center = candidate;
                radii = candidate_radii;
                current_cost = candidate_cost;
                damping = (damping / 10.0).max(Scalar::EPSILON);
                improved = true;
                converged = step_small || cost_small || current_cost == 0.0;
                break;
            }
            damping *= 10.0;
        }

        if !improved {
            // no damping reduces the cost any further
            converged = true;
        }
    }

    let radius = mean(&radii);
    let residual_sum_squares = radii.iter().map(|r| (r - radius).powi(2)).sum();
    CircleFit {
        center,
        radius,
        radii,
        residual_sum_squares,
        iterations,
        converged,
    }
}
