//! Initial conditions and the sampled trajectory produced by the solver

use crate::error::ConfigError;
use crate::physics::constants::{MEV_PER_GEV, SPEED_OF_LIGHT};
use crate::physics::integrators::PhaseState;
use crate::physics::lorentz::{total_energy, velocity_from_momentum};
use crate::physics::math::{Scalar, Vector, spherical_to_cartesian};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_3;

/// Starting point of one trajectory: time span, momentum (spherical) and
/// position
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InitialConditions {
    /// Start time in seconds
    pub t0: Scalar,
    /// End time in seconds
    pub tf: Scalar,
    /// Number of equally spaced output times, endpoints included
    pub n_t: usize,
    /// Momentum magnitude in MeV/c
    pub p0: Scalar,
    /// Polar angle of the momentum, from +z
    pub theta0: Scalar,
    /// Azimuthal angle of the momentum, from +x
    pub phi0: Scalar,
    pub x0: Scalar,
    pub y0: Scalar,
    pub z0: Scalar,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            t0: 0.0,
            tf: 2.0e-8,
            n_t: 2001,
            p0: 104.96,
            theta0: FRAC_PI_3,
            phi0: 0.0,
            x0: 0.0,
            y0: 0.0,
            z0: 0.0,
        }
    }
}

impl InitialConditions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_t < 2 {
            return Err(ConfigError::TooFewEvaluationPoints(self.n_t));
        }
        let invalid_span = Err(ConfigError::InvalidTimeSpan {
            t0: self.t0,
            tf: self.tf,
        });
        if !self.t0.is_finite() || !self.tf.is_finite() || self.tf <= self.t0 {
            return invalid_span;
        }
        // a span of a few ulps cannot hold n_t distinct output times
        let times = self.evaluation_times();
        if !times.windows(2).all(|pair| pair[0] < pair[1]) {
            return invalid_span;
        }
        let values = [
            self.p0,
            self.theta0,
            self.phi0,
            self.x0,
            self.y0,
            self.z0,
        ];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::NonFiniteInitialConditions);
        }
        Ok(())
    }

    pub fn position(&self) -> Vector {
        Vector::new(self.x0, self.y0, self.z0)
    }

    pub fn momentum(&self) -> Vector {
        spherical_to_cartesian(self.p0, self.theta0, self.phi0)
    }

    pub fn initial_state(&self) -> PhaseState {
        PhaseState::new(self.position(), self.momentum())
    }

    /// Output times: `n_t` points from `t0` to `tf` inclusive
    pub fn evaluation_times(&self) -> Vec<Scalar> {
        let intervals = self.n_t.saturating_sub(1).max(1) as Scalar;
        let span = self.tf - self.t0;
        let mut times: Vec<Scalar> = (0..self.n_t)
            .map(|i| self.t0 + span * (i as Scalar / intervals))
            .collect();
        if let Some(last) = times.last_mut() {
            *last = self.tf;
        }
        times
    }
}

/// One output point of a trajectory.
///
/// Only time, position and momentum are stored as given; everything else is
/// derived from them once, at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    t: Scalar,
    position: Vector,
    momentum: Vector,
    velocity: Vector,
    transverse_momentum: Scalar,
    total_momentum: Scalar,
    energy: Scalar,
    beta: Scalar,
    speed: Scalar,
    theta: Scalar,
    phi: Scalar,
}

impl TrajectorySample {
    /// `mass` in GeV/c²
    pub fn new(t: Scalar, position: Vector, momentum: Vector, mass: Scalar) -> Self {
        let mass_mev = mass * MEV_PER_GEV;
        let transverse_momentum = momentum.x.hypot(momentum.y);
        let total_momentum = momentum.length();
        let velocity = velocity_from_momentum(momentum, mass_mev);
        let speed = velocity.length();

        Self {
            t,
            position,
            momentum,
            velocity,
            transverse_momentum,
            total_momentum,
            energy: total_energy(total_momentum, mass_mev),
            beta: speed / SPEED_OF_LIGHT,
            speed,
            theta: libm::atan2(transverse_momentum, momentum.z),
            phi: libm::atan2(momentum.y, momentum.x),
        }
    }

    pub(crate) fn from_state(t: Scalar, state: &PhaseState, mass: Scalar) -> Self {
        Self::new(t, state.position, state.momentum, mass)
    }

    #[inline]
    pub fn t(&self) -> Scalar {
        self.t
    }

    /// Position in meters
    #[inline]
    pub fn position(&self) -> Vector {
        self.position
    }

    /// Momentum in MeV/c
    #[inline]
    pub fn momentum(&self) -> Vector {
        self.momentum
    }

    pub fn state(&self) -> PhaseState {
        PhaseState::new(self.position, self.momentum)
    }

    /// Velocity in m/s
    #[inline]
    pub fn velocity(&self) -> Vector {
        self.velocity
    }

    #[inline]
    pub fn transverse_momentum(&self) -> Scalar {
        self.transverse_momentum
    }

    #[inline]
    pub fn total_momentum(&self) -> Scalar {
        self.total_momentum
    }

    /// Total energy in MeV
    #[inline]
    pub fn energy(&self) -> Scalar {
        self.energy
    }

    #[inline]
    pub fn beta(&self) -> Scalar {
        self.beta
    }

    #[inline]
    pub fn speed(&self) -> Scalar {
        self.speed
    }

    /// Polar angle of the momentum
    #[inline]
    pub fn theta(&self) -> Scalar {
        self.theta
    }

    /// Azimuthal angle of the momentum
    #[inline]
    pub fn phi(&self) -> Scalar {
        self.phi
    }
}

/// A z plane reached during integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZPlaneCrossing {
    pub t: Scalar,
    pub plane: Scalar,
    /// z at the located time; within the plane's tolerance band unless the
    /// step jumped across it
    pub z: Scalar,
}

/// Why the trajectory ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationCause {
    ReachedEndTime,
    BoundsExited { t: Scalar, position: Vector },
}

impl TerminationCause {
    pub fn is_early(&self) -> bool {
        matches!(self, TerminationCause::BoundsExited { .. })
    }
}

/// Step counts of one solve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStatistics {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub derivative_evaluations: usize,
}

/// Samples at the output times, strictly increasing in `t`, together with
/// the recorded events and the termination cause
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
    z_crossings: Vec<ZPlaneCrossing>,
    termination: TerminationCause,
    statistics: SolverStatistics,
}

impl Trajectory {
    pub(crate) fn new(
        samples: Vec<TrajectorySample>,
        z_crossings: Vec<ZPlaneCrossing>,
        termination: TerminationCause,
        statistics: SolverStatistics,
    ) -> Self {
        debug_assert!(samples.windows(2).all(|pair| pair[0].t < pair[1].t));
        Self {
            samples,
            z_crossings,
            termination,
            statistics,
        }
    }

    /// Wrap externally produced samples, e.g. a recorded or analytic track.
    ///
    /// Samples are sorted by time; duplicates in time are dropped.
    pub fn from_samples(mut samples: Vec<TrajectorySample>) -> Self {
        samples.sort_by(|a, b| a.t.total_cmp(&b.t));
        samples.dedup_by(|later, earlier| later.t == earlier.t);
        Self::new(
            samples,
            Vec::new(),
            TerminationCause::ReachedEndTime,
            SolverStatistics::default(),
        )
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn z_crossings(&self) -> &[ZPlaneCrossing] {
        &self.z_crossings
    }

    pub fn termination(&self) -> TerminationCause {
        self.termination
    }

    pub fn statistics(&self) -> SolverStatistics {
        self.statistics
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&TrajectorySample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }
}
