//! Schema module - Instruction set, configuration and report types.

mod config;
mod evolution;
mod program;

pub use config::*;
pub use evolution::*;
pub use program::*;
