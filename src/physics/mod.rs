pub mod bounds;
pub mod constants;
pub mod events;
pub mod fields;
pub mod integrators;
pub mod lorentz;
pub mod math;
pub mod solver;
pub mod species;
