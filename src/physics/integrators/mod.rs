//! Adaptive Runge-Kutta methods for the particle equation of motion

use crate::error::DomainError;
use crate::physics::math::{Scalar, Vector};
use std::ops::{Add, AddAssign, Mul, Sub};

pub mod cash_karp;
pub mod dop853;
pub mod dormand_prince;
pub mod registry;
mod tableau;

pub use cash_karp::CashKarp;
pub use dop853::Dop853;
pub use dormand_prince::DormandPrince;

/// Phase-space point of one particle: position in meters, momentum in MeV/c.
///
/// The same type holds time derivatives, where `position` is the velocity
/// (m/s) and `momentum` the force (MeV/c per second).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseState {
    pub position: Vector,
    pub momentum: Vector,
}

impl PhaseState {
    pub fn new(position: Vector, momentum: Vector) -> Self {
        Self { position, momentum }
    }

    #[inline]
    pub fn to_array(&self) -> [Scalar; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.momentum.x,
            self.momentum.y,
            self.momentum.z,
        ]
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.momentum.is_finite()
    }
}

impl Add for PhaseState {
    type Output = PhaseState;

    #[inline]
    fn add(self, rhs: PhaseState) -> PhaseState {
        PhaseState::new(self.position + rhs.position, self.momentum + rhs.momentum)
    }
}

impl AddAssign for PhaseState {
    #[inline]
    fn add_assign(&mut self, rhs: PhaseState) {
        self.position += rhs.position;
        self.momentum += rhs.momentum;
    }
}

impl Sub for PhaseState {
    type Output = PhaseState;

    #[inline]
    fn sub(self, rhs: PhaseState) -> PhaseState {
        PhaseState::new(self.position - rhs.position, self.momentum - rhs.momentum)
    }
}

impl Mul<Scalar> for PhaseState {
    type Output = PhaseState;

    #[inline]
    fn mul(self, rhs: Scalar) -> PhaseState {
        PhaseState::new(self.position * rhs, self.momentum * rhs)
    }
}

/// Right-hand side of a first-order system `dy/dt = f(t, y)`
pub trait EquationOfMotion {
    fn derivative(&self, t: Scalar, state: &PhaseState) -> Result<PhaseState, DomainError>;
}

/// One trial step of an embedded method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEstimate {
    /// Propagated state at `t + dt`
    pub state: PhaseState,
    /// Difference between the propagated and the embedded solution
    pub error: PhaseState,
    /// Lower-order error estimate for methods that blend two embedded
    /// solutions into their error norm
    pub secondary_error: Option<PhaseState>,
}

/// Base trait for all integrators
pub trait Integrator: Send + Sync {
    fn clone_box(&self) -> Box<dyn Integrator>;

    /// Attempt a step of size `dt` from `(t, state)`.
    ///
    /// Returns the propagated state together with a local error estimate;
    /// accepting or rejecting the step is up to the caller.
    fn step(
        &self,
        system: &dyn EquationOfMotion,
        t: Scalar,
        state: &PhaseState,
        dt: Scalar,
    ) -> Result<StepEstimate, DomainError>;

    /// Order of the propagated solution
    fn convergence_order(&self) -> usize;

    /// Order of the embedded solution used for the error estimate
    fn error_estimator_order(&self) -> usize;

    fn name(&self) -> &'static str;

    fn aliases(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_state_arithmetic() {
        let a = PhaseState::new(Vector::new(1.0, 2.0, 3.0), Vector::new(4.0, 5.0, 6.0));
        let b = PhaseState::new(Vector::ONE, Vector::ONE);

        let sum = a + b * 2.0;
        assert_eq!(sum.to_array(), [3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!((sum - a).to_array(), [2.0; 6]);

        let mut c = a;
        c += b;
        assert_eq!(c.to_array(), [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_phase_state_finiteness() {
        let mut state = PhaseState::default();
        assert!(state.is_finite());
        state.momentum.y = Scalar::INFINITY;
        assert!(!state.is_finite());
    }
}
