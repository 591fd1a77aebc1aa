//! Evosort - Genetic programming of sorting programs for a tiny VM.
//!
//! Candidate programs are sequences of guarded commands for a branching
//! virtual machine that walks a pointer over a list, swaps neighbours and
//! toggles two flags. A population of such programs is repeatedly run on
//! shuffled lists, scored by how sorted the result is, truncated to the best
//! few and recombined into the next generation.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Instruction set, configuration and report types
//! - `compute`: The VM executor and the evolutionary search
//!
//! # Example
//!
//! ```rust
//! use evosort::{
//!     compute::{Executor, Interruption, evolution::sortedness},
//!     schema::{Command, Operation, Program},
//! };
//! use rand::SeedableRng;
//!
//! let program = Program::new(vec![Command::unconditional(Operation::Return)]);
//! let executor = Executor::new(Interruption::AtStep(1000));
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//!
//! let run = executor.run(&program, &[3, 1, 2], &mut rng);
//! assert_eq!(run.sequence, vec![3, 1, 2]);
//! assert_eq!(run.steps, 1);
//! assert!((sortedness(&run.sequence) - 1.0 / 3.0).abs() < 1e-9);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::Executor;
pub use compute::evolution::EvolutionEngine;
pub use schema::{Command, EvolutionConfig, Program};
