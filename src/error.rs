//! Error types for tracking and reconstruction

use crate::physics::integrators::PhaseState;
use crate::physics::math::Scalar;
use thiserror::Error;

/// Result type for the solve pipeline
pub type TrackResult<T> = Result<T, TrackError>;

/// Invalid configuration, rejected before any numerical work starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown species identifier: {0}")]
    UnknownSpecies(i32),

    #[error("At least 2 evaluation points are required, got {0}")]
    TooFewEvaluationPoints(usize),

    #[error("Invalid time span: t0 = {t0}, tf = {tf}")]
    InvalidTimeSpan { t0: Scalar, tf: Scalar },

    #[error("Initial conditions must be finite")]
    NonFiniteInitialConditions,

    #[error("Window step and stride must be positive: step = {step}, stride = {stride}")]
    ZeroWindowParameter { step: usize, stride: usize },

    #[error("Stride {stride} exceeds window step {step}")]
    StrideExceedsStep { step: usize, stride: usize },

    #[error("Malformed bounds: {0}")]
    MalformedBounds(String),

    #[error("Tolerances must be positive and finite: atol = {atol}, rtol = {rtol}")]
    InvalidTolerance { atol: Scalar, rtol: Scalar },

    #[error("Z-plane tolerances must be non-negative and finite: atol = {atol}, rtol = {rtol}")]
    InvalidEventTolerance { atol: Scalar, rtol: Scalar },

    #[error("Invalid solver option: {0}")]
    InvalidSolverOption(String),

    #[error("{0}")]
    UnknownIntegrator(String),
}

/// The equation of motion was evaluated outside its physical domain
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DomainError {
    #[error("Speed {speed} m/s is not below the speed of light")]
    Superluminal { speed: Scalar },

    #[error("Non-finite derivative")]
    NonFinite,
}

/// The adaptive solver could not reach the end of the requested time span.
///
/// Every variant carries the last accepted time and state, and how many
/// output samples had been produced before the failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("Numerical domain error at t = {last_time} s: {source}")]
    Domain {
        last_time: Scalar,
        last_state: PhaseState,
        samples: usize,
        #[source]
        source: DomainError,
    },

    #[error("Step size {step} s underflowed at t = {last_time} s")]
    StepSizeUnderflow {
        last_time: Scalar,
        last_state: PhaseState,
        samples: usize,
        step: Scalar,
    },

    #[error("Step limit of {max_steps} exceeded at t = {last_time} s")]
    StepLimitExceeded {
        last_time: Scalar,
        last_state: PhaseState,
        samples: usize,
        max_steps: usize,
    },
}

impl IntegrationError {
    /// Furthest time the solver reached successfully
    pub fn last_time(&self) -> Scalar {
        match self {
            IntegrationError::Domain { last_time, .. }
            | IntegrationError::StepSizeUnderflow { last_time, .. }
            | IntegrationError::StepLimitExceeded { last_time, .. } => *last_time,
        }
    }

    /// State at [`IntegrationError::last_time`]
    pub fn last_state(&self) -> PhaseState {
        match self {
            IntegrationError::Domain { last_state, .. }
            | IntegrationError::StepSizeUnderflow { last_state, .. }
            | IntegrationError::StepLimitExceeded { last_state, .. } => *last_state,
        }
    }
}

/// A reconstruction window that could not produce an estimate
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum WindowError {
    #[error("Window has {points} points, a circle fit needs at least 3")]
    InsufficientPoints { points: usize },

    #[error("Window spans no time")]
    ZeroDuration,

    #[error("Circle fit produced a non-finite center or radius")]
    NonFiniteCircle,

    #[error("Window has no transverse arc (radius {radius} m, swept angle {arc_angle} rad)")]
    DegenerateCircle { radius: Scalar, arc_angle: Scalar },

    #[error("Longitudinal displacement {z_length} m is too small for a pitch angle")]
    DegeneratePitch { z_length: Scalar },

    #[error("Reconstructed speed {speed} m/s is not below the speed of light")]
    Superluminal { speed: Scalar },

    #[error("Estimate is not physical: p = {p} MeV/c, m = {mass} MeV/c², E = {energy} MeV")]
    UnphysicalEstimate {
        p: Scalar,
        mass: Scalar,
        energy: Scalar,
    },
}

/// Errors from the solve pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Integration failed: {0}")]
    Integration(#[from] IntegrationError),
}
