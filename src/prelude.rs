//! emtracks prelude module
//!
//! This module re-exports the most commonly used types, traits, and functions
//! to reduce import boilerplate.

pub use crate::physics::math::{Scalar, Vector, Vector2};

// Config
pub use crate::config::RunConfig;

// Errors
pub use crate::error::{
    ConfigError, DomainError, IntegrationError, TrackError, TrackResult, WindowError,
};

// Physics
pub use crate::physics::bounds::{Aabb3d, Bounds};
pub use crate::physics::events::{TerminationPolicy, ZEvents};
pub use crate::physics::fields::{FieldModel, FieldSampler, FnField};
pub use crate::physics::integrators::registry::IntegratorRegistry;
pub use crate::physics::integrators::{EquationOfMotion, Integrator, PhaseState};
pub use crate::physics::solver::{SolverOptions, TrajectorySolver};
pub use crate::physics::species::ParticleModel;

// Trajectory and reconstruction
pub use crate::reconstruction::{
    ReconstructedMomentum, ReconstructedMomentumTable, ReconstructionOptions, SampleFilter,
    WindowReconstruction, reconstruct, reconstruct_samples,
};
pub use crate::trajectory::{
    InitialConditions, SolverStatistics, TerminationCause, Trajectory, TrajectorySample,
    ZPlaneCrossing,
};
