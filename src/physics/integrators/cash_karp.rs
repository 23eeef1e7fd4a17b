//! Cash-Karp 5(4) embedded Runge-Kutta method

use super::tableau::ButcherTableau;
use super::{EquationOfMotion, Integrator, PhaseState, StepEstimate};
use crate::error::DomainError;
use crate::physics::math::Scalar;

/// Cash-Karp integrator
///
/// Six-stage method with fifth- and fourth-order solutions sharing the same
/// derivative evaluations. One stage cheaper than Dormand-Prince per trial
/// step, with a slightly larger error constant.
///
/// Reference: Cash, Karp (1990) "A variable order Runge-Kutta method for
/// initial value problems with rapidly varying right-hand sides"
#[derive(Debug, Clone, Copy, Default)]
pub struct CashKarp;

pub(super) const TABLEAU: ButcherTableau<6> = ButcherTableau {
    c: [0.0, 1.0 / 5.0, 3.0 / 10.0, 3.0 / 5.0, 1.0, 7.0 / 8.0],
    a: [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 10.0, -9.0 / 10.0, 6.0 / 5.0, 0.0, 0.0, 0.0],
        [-11.0 / 54.0, 5.0 / 2.0, -70.0 / 27.0, 35.0 / 27.0, 0.0, 0.0],
        [
            1631.0 / 55296.0,
            175.0 / 512.0,
            575.0 / 13824.0,
            44275.0 / 110592.0,
            253.0 / 4096.0,
            0.0,
        ],
    ],
    b: [
        37.0 / 378.0,
        0.0,
        250.0 / 621.0,
        125.0 / 594.0,
        0.0,
        512.0 / 1771.0,
    ],
    b_embedded: [
        2825.0 / 27648.0,
        0.0,
        18575.0 / 48384.0,
        13525.0 / 55296.0,
        277.0 / 14336.0,
        1.0 / 4.0,
    ],
};

impl Integrator for CashKarp {
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
        "cash_karp"
    }

    fn aliases(&self) -> Vec<&'static str> {
        vec!["rkck"]
    }
}
