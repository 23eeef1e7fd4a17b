//! emtracks library
//!
//! Relativistic tracking of a charged particle through static electric and
//! magnetic fields, and reconstruction of its momentum from the sampled
//! track by fitting circular arcs window by window.

pub mod cli;
pub mod config;
pub mod error;
pub mod physics;
pub mod prelude;
pub mod reconstruction;
pub mod trajectory;
