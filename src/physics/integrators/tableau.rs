//! Explicit embedded Runge-Kutta stepping driven by a Butcher tableau

use super::{EquationOfMotion, PhaseState, StepEstimate};
use crate::error::DomainError;
use crate::physics::math::Scalar;

/// Coefficients of an explicit embedded method with `S` stages
pub(super) struct ButcherTableau<const S: usize> {
    pub c: [Scalar; S],
    /// Strictly lower triangular
    pub a: [[Scalar; S]; S],
    /// Weights of the propagated solution
    pub b: [Scalar; S],
    /// Weights of the embedded solution
    pub b_embedded: [Scalar; S],
}

impl<const S: usize> ButcherTableau<S> {
    pub(super) fn step(
        &self,
        system: &dyn EquationOfMotion,
        t: Scalar,
        state: &PhaseState,
        dt: Scalar,
    ) -> Result<StepEstimate, DomainError> {
        let k = self.stages(system, t, state, dt)?;
        let error_weights: [Scalar; S] =
            std::array::from_fn(|stage| self.b[stage] - self.b_embedded[stage]);

        Ok(StepEstimate {
            state: *state + weighted_sum(&k, &self.b, dt),
            error: weighted_sum(&k, &error_weights, dt),
            secondary_error: None,
        })
    }

    /// Stage derivatives `k_i` of a step of size `dt` from `(t, state)`
    pub(super) fn stages(
        &self,
        system: &dyn EquationOfMotion,
        t: Scalar,
        state: &PhaseState,
        dt: Scalar,
    ) -> Result<[PhaseState; S], DomainError> {
        let mut k = [PhaseState::default(); S];

        for stage in 0..S {
            let mut y = *state;
            for (j, k_j) in k.iter().enumerate().take(stage) {
                let a = self.a[stage][j];
                if a != 0.0 {
                    y += *k_j * (a * dt);
                }
            }
            k[stage] = system.derivative(t + self.c[stage] * dt, &y)?;
        }

        Ok(k)
    }

    /// Largest violation of the order-one consistency conditions:
    /// weights summing to one and row sums of `a` equal to `c`.
    #[cfg(test)]
    pub(super) fn consistency_defect(&self) -> Scalar {
        let mut defect = (self.b.iter().sum::<Scalar>() - 1.0).abs();
        defect = defect.max((self.b_embedded.iter().sum::<Scalar>() - 1.0).abs());
        for (row, c) in self.a.iter().zip(self.c.iter()) {
            defect = defect.max((row.iter().sum::<Scalar>() - c).abs());
        }
        defect
    }
}

/// `dt · Σ w_i k_i`
pub(super) fn weighted_sum<const S: usize>(
    k: &[PhaseState; S],
    weights: &[Scalar; S],
    dt: Scalar,
) -> PhaseState {
    k.iter()
        .zip(weights)
        .filter(|(_, weight)| **weight != 0.0)
        .fold(PhaseState::default(), |sum, (k_i, weight)| sum + *k_i * (weight * dt))
}
