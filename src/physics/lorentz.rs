//! Relativistic equation of motion under the Lorentz force

use super::constants::{ELEMENTARY_CHARGE, KG_M_PER_S_TO_MEV_C, SPEED_OF_LIGHT};
use super::fields::FieldSampler;
use super::integrators::{EquationOfMotion, PhaseState};
use super::math::{Scalar, Vector};
use super::species::ParticleModel;
use crate::error::DomainError;

/// Velocity (m/s) of a particle with the given momentum (MeV/c) and mass (MeV/c²)
#[inline]
pub fn velocity_from_momentum(momentum: Vector, mass_mev: Scalar) -> Vector {
    momentum * (SPEED_OF_LIGHT / total_energy(momentum.length(), mass_mev))
}

/// Total energy (MeV) from the mass-shell relation
#[inline]
pub fn total_energy(momentum: Scalar, mass_mev: Scalar) -> Scalar {
    (momentum * momentum + mass_mev * mass_mev).sqrt()
}

/// Lorentz factor of a velocity.
///
/// Speeds at or above c have no real Lorentz factor and are reported as a
/// domain error instead of producing NaN.
pub fn lorentz_factor(velocity: Vector) -> Result<Scalar, DomainError> {
    let beta_squared = (velocity / SPEED_OF_LIGHT).length_squared();
    if beta_squared < 1.0 {
        Ok(1.0 / (1.0 - beta_squared).sqrt())
    } else {
        Err(DomainError::Superluminal {
            speed: velocity.length(),
        })
    }
}

/// `dy/dt` for a charged particle in static electric and magnetic fields.
///
/// The state is (position in m, momentum in MeV/c). The momentum derivative
/// is `q·e·(E·k + (p × B)/(γ·m))`, where `k` converts SI momentum to MeV/c.
pub struct LorentzForce<'a> {
    particle: &'a ParticleModel,
    magnetic: &'a dyn FieldSampler,
    electric: &'a dyn FieldSampler,
}

impl<'a> LorentzForce<'a> {
    pub fn new(
        particle: &'a ParticleModel,
        magnetic: &'a dyn FieldSampler,
        electric: &'a dyn FieldSampler,
    ) -> Self {
        Self {
            particle,
            magnetic,
            electric,
        }
    }
}

impl EquationOfMotion for LorentzForce<'_> {
    fn derivative(&self, _t: Scalar, state: &PhaseState) -> Result<PhaseState, DomainError> {
        let velocity = velocity_from_momentum(state.momentum, self.particle.mass_mev());
        let gamma = lorentz_factor(velocity)?;

        let b_field = self.magnetic.evaluate(state.position);
        let e_field = self.electric.evaluate(state.position);

        let force = (e_field * KG_M_PER_S_TO_MEV_C
            + state.momentum.cross(b_field) / (gamma * self.particle.mass_kg()))
            * (self.particle.charge() * ELEMENTARY_CHARGE);

        let derivative = PhaseState::new(velocity, force);
        if derivative.is_finite() {
            Ok(derivative)
        } else {
            Err(DomainError::NonFinite)
        }
    }
}
