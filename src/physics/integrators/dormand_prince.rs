//! Dormand-Prince 5(4) embedded Runge-Kutta method

use super::tableau::ButcherTableau;
use super::{EquationOfMotion, Integrator, PhaseState, StepEstimate};
use crate::error::DomainError;
use crate::physics::math::Scalar;

/// Dormand-Prince 5(4) integrator
///
/// Seven-stage explicit method propagating the fifth-order solution
/// (local extrapolation) and estimating the error against an embedded
/// fourth-order solution. This is the workhorse method behind most
/// "RK45" adaptive solvers and is well suited to smooth, non-stiff,
/// oscillatory systems such as gyration in a magnetic field.
///
/// Reference: Dormand, Prince (1980) "A family of embedded Runge-Kutta formulae"
#[derive(Debug, Clone, Copy, Default)]
pub struct DormandPrince;

pub(super) const TABLEAU: ButcherTableau<7> = ButcherTableau {
    c: [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
    a: [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0, 0.0],
        [
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
            0.0,
            0.0,
        ],
        [
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
            0.0,
        ],
    ],
    b: [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    b_embedded: [
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ],
};

impl Integrator for DormandPrince {
    fn clone_box(&self) -> Box<dyn Integrator> {
        Box::new(*self)
    }

    fn step(
        &self,
        system: &dyn EquationOfMotion,
        t: Scalar,
        state: &PhaseState,
        dt: Scalar,
    ) -> Result<StepEstimate, DomainError> {
        TABLEAU.step(system, t, state, dt)
    }

    fn convergence_order(&self) -> usize {
        5
    }

    fn error_estimator_order(&self) -> usize {
        4
    }

    fn name(&self) -> &'static str {
        "dormand_prince"
    }

    fn aliases(&self) -> Vec<&'static str> {
        vec!["dopri5", "rk45"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::math::Vector;

    /// Uniform circular motion in the xy plane with unit angular frequency:
    /// position' = momentum, momentum' = -position
    struct Rotation;

    impl EquationOfMotion for Rotation {
        fn derivative(&self, _t: Scalar, state: &PhaseState) -> Result<PhaseState, DomainError> {
            Ok(PhaseState::new(state.momentum, -state.position))
        }
    }

    #[test]
    fn test_tableau_is_consistent() {
        assert!(TABLEAU.consistency_defect() < 1e-14);
    }

    #[test]
    fn test_fifth_order_local_error() {
        let state = PhaseState::new(Vector::X, Vector::Y);
        let mut previous_error: Option<Scalar> = None;

        for dt in [0.2, 0.1] {
            let estimate = DormandPrince.step(&Rotation, 0.0, &state, dt).unwrap();
            let exact = Vector::new(dt.cos(), dt.sin(), 0.0);
            let error = (estimate.state.position - exact).length();

            if let Some(previous) = previous_error {
                // local error scales as dt^6
                let order = (previous / error).log2();
                assert!(order > 5.5, "Unexpected local order: {order}");
            }
            previous_error = Some(error);
        }
    }

    #[test]
    fn test_error_estimate_is_small_for_small_steps() {
        let state = PhaseState::new(Vector::X, Vector::Y);
        let estimate = DormandPrince.step(&Rotation, 0.0, &state, 0.01).unwrap();
        let error = estimate.error.to_array().iter().fold(0.0_f64, |m, e| m.max(e.abs()));
        assert!(error < 1e-10, "error estimate = {error}");
    }
}
