//! Compute module - VM execution and evolutionary search.

pub mod evolution;
mod executor;

pub use executor::*;
