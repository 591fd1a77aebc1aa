//! Evolutionary search over VM programs.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Fitness** (`fitness`): sortedness score, trial list sampling and
//!   multi-trial evaluation
//! - **Genome Operations** (`genome`): random generation, mutation and
//!   splicing of programs
//! - **Search** (`search`): the generational driver and its final pass
//!
//! Each generation every program runs once on each of a batch of shuffled
//! lists. Entries are ranked by total score, then by execution length and
//! code size, and only the top survivors are kept. Every unordered pair of
//! survivors then breeds a fixed number of children: a survivor paired with
//! itself is mutated, two distinct survivors are spliced and mutated. The
//! children replace the population.
//!
//! # Example
//!
//! ```rust,no_run
//! use evosort::schema::EvolutionConfig;
//! use evosort::compute::evolution::EvolutionEngine;
//!
//! let config = EvolutionConfig::default();
//! let mut engine = EvolutionEngine::new(config);
//! let cancel = engine.cancel_handle();
//!
//! let result = engine.run_with_callback(|report| {
//!     if let Some(best) = report.best() {
//!         println!("Generation {}: best score = {:.3}", report.generation, best.score);
//!     }
//!     if report.generation == 50 {
//!         cancel.store(true, std::sync::atomic::Ordering::Relaxed);
//!     }
//! });
//!
//! println!("Best final program:\n{}", result.final_report.survivors[0].program);
//! ```

mod fitness;
mod genome;
mod search;

pub use fitness::{FitnessEvaluator, TrialSet, TrialTotals, sortedness};
pub use genome::ProgramRng;
pub use search::{EvolutionEngine, PopulationEntry};
