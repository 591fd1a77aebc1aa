//! Progress and result types produced by the evolution driver.

use serde::{Deserialize, Serialize};

use super::Program;

/// Aggregated statistics of one population entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntrySummary {
    /// Sortedness score summed over the trial lists.
    pub score: f64,
    /// Executed steps summed over the trial lists.
    pub execution_length: u64,
    /// Number of commands in the program.
    pub code_size: usize,
}

/// Report emitted after each generation is ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation number, starting at 1.
    pub generation: usize,
    /// Lengths of the trial lists used this generation.
    pub list_sizes: Vec<usize>,
    /// Number of programs evaluated.
    pub evaluated: usize,
    /// Score of the worst entry before truncation.
    pub lowest_score: f64,
    /// Surviving entries, best first.
    pub survivors: Vec<EntrySummary>,
    /// Best program of the generation.
    pub best_program: Program,
    /// Wall time spent on the generation (in seconds).
    pub elapsed_seconds: f64,
}

impl GenerationReport {
    /// Best entry of the generation, if any survived.
    pub fn best(&self) -> Option<&EntrySummary> {
        self.survivors.first()
    }
}

/// A ranked program from the final pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEntry {
    pub summary: EntrySummary,
    pub program: Program,
}

/// Report produced by the relaxed evaluation after the run stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    /// Length of the single shuffled list.
    pub list_size: usize,
    /// Number of programs evaluated.
    pub evaluated: usize,
    /// Score of the worst entry before truncation.
    pub lowest_score: f64,
    /// Top entries, best first.
    pub survivors: Vec<FinalEntry>,
    /// Wall time spent on the pass (in seconds).
    pub elapsed_seconds: f64,
}

/// Per-generation history for analysis.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best cumulative score per generation.
    pub best_score: Vec<f64>,
    /// Lowest cumulative score per generation.
    pub lowest_score: Vec<f64>,
    /// Cumulative execution length of the best entry.
    pub best_execution_length: Vec<u64>,
    /// Code size of the best entry.
    pub best_code_size: Vec<usize>,
}

impl EvolutionHistory {
    pub(crate) fn record(&mut self, report: &GenerationReport) {
        if let Some(best) = report.best() {
            self.best_score.push(best.score);
            self.best_execution_length.push(best.execution_length);
            self.best_code_size.push(best.code_size);
        }
        self.lowest_score.push(report.lowest_score);
    }
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Reason the generational loop ended.
    pub stop_reason: StopReason,
    /// Generations completed before stopping.
    pub generations: usize,
    /// Output of the relaxed final pass.
    pub final_report: FinalReport,
    /// Full history for analysis.
    pub history: EvolutionHistory,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token was set.
    Cancelled,
    /// Reached the configured generation limit.
    MaxGenerations,
}
