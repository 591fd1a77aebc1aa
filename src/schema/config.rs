//! Configuration types for the evolutionary search and the VM.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Upper bound on list sizes and program lengths, and on the Gaussian
/// parameters they are drawn from.
pub const MAX_SIZE: usize = 1_000_000;

/// Top-level configuration for an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Interruption policy used while evaluating generations.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Settings for the relaxed pass run after cancellation.
    #[serde(default)]
    pub finalization: FinalizationConfig,
    /// Population and reproduction settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Trial list sampling per generation.
    #[serde(default)]
    pub trials: TrialConfig,
    /// Distributions for random programs.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Mutation and recombination probabilities.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// When the executor forcibly stops a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Deterministic step cap. Disables `chance_of_interruption` when set.
    #[serde(default = "default_interrupt_at")]
    pub interrupt_at: Option<u64>,
    /// Per-step probability of interruption when no cap is set.
    #[serde(default = "default_chance_of_interruption")]
    pub chance_of_interruption: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            interrupt_at: default_interrupt_at(),
            chance_of_interruption: default_chance_of_interruption(),
        }
    }
}

fn default_interrupt_at() -> Option<u64> {
    Some(1000)
}
fn default_chance_of_interruption() -> f64 {
    1e-5
}

/// Relaxed evaluation used once the run is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizationConfig {
    /// Length of the single shuffled list.
    #[serde(default = "default_final_list_size")]
    pub list_size: usize,
    /// Interruption policy for the final pass.
    #[serde(default = "default_final_execution")]
    pub execution: ExecutionConfig,
}

impl Default for FinalizationConfig {
    fn default() -> Self {
        Self {
            list_size: default_final_list_size(),
            execution: default_final_execution(),
        }
    }
}

fn default_final_list_size() -> usize {
    10
}
fn default_final_execution() -> ExecutionConfig {
    ExecutionConfig {
        interrupt_at: Some(10_000),
        chance_of_interruption: default_chance_of_interruption(),
    }
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of random programs in the seed population.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,
    /// Entries kept after each ranking step.
    #[serde(default = "default_survivors")]
    pub survivors: usize,
    /// Children produced for every survivor pair.
    #[serde(default = "default_offspring_per_pair")]
    pub offspring_per_pair: usize,
    /// Stop after this many generations. `None` runs until cancelled.
    #[serde(default)]
    pub max_generations: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            survivors: default_survivors(),
            offspring_per_pair: default_offspring_per_pair(),
            max_generations: None,
        }
    }
}

fn default_initial_size() -> usize {
    10_000
}
fn default_survivors() -> usize {
    10
}
fn default_offspring_per_pair() -> usize {
    100
}

impl PopulationConfig {
    /// Size of every bred generation: one batch per unordered pair, self-pairs included.
    pub fn offspring_count(&self) -> usize {
        self.survivors * (self.survivors + 1) / 2 * self.offspring_per_pair
    }
}

/// How trial lists are sampled each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    #[serde(default = "default_lists_per_generation")]
    pub lists_per_generation: usize,
    #[serde(default = "default_list_size_mean")]
    pub list_size_mean: f64,
    #[serde(default = "default_list_size_std")]
    pub list_size_std: f64,
    /// Sampled sizes below this are raised to it.
    #[serde(default = "default_min_list_size")]
    pub min_list_size: usize,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            lists_per_generation: default_lists_per_generation(),
            list_size_mean: default_list_size_mean(),
            list_size_std: default_list_size_std(),
            min_list_size: default_min_list_size(),
        }
    }
}

fn default_lists_per_generation() -> usize {
    10
}
fn default_list_size_mean() -> f64 {
    20.0
}
fn default_list_size_std() -> f64 {
    10.0
}
fn default_min_list_size() -> usize {
    2
}

/// Distributions used to build random commands and programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_program_length_mean")]
    pub program_length_mean: f64,
    #[serde(default = "default_program_length_std")]
    pub program_length_std: f64,
    #[serde(default = "default_branch_offset_mean")]
    pub branch_offset_mean: f64,
    #[serde(default = "default_branch_offset_std")]
    pub branch_offset_std: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program_length_mean: default_program_length_mean(),
            program_length_std: default_program_length_std(),
            branch_offset_mean: default_branch_offset_mean(),
            branch_offset_std: default_branch_offset_std(),
        }
    }
}

fn default_program_length_mean() -> f64 {
    100.0
}
fn default_program_length_std() -> f64 {
    20.0
}
fn default_branch_offset_mean() -> f64 {
    -10.0
}
fn default_branch_offset_std() -> f64 {
    15.0
}

/// Mutation and recombination probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Chance of resampling each command field.
    #[serde(default = "default_field_rate")]
    pub field_rate: f64,
    /// Standard deviation of the branch offset drift.
    #[serde(default = "default_branch_drift_std")]
    pub branch_drift_std: f64,
    /// Chance, per position past the first, of cutting the program there.
    #[serde(default = "default_truncate_rate")]
    pub truncate_rate: f64,
    /// Chance, per position, of deleting the command.
    #[serde(default = "default_structural_rate")]
    pub delete_rate: f64,
    /// Chance, per position, of swapping the command with its successor.
    #[serde(default = "default_structural_rate")]
    pub swap_rate: f64,
    /// Chance, before the walk and after each position, of prepending a random command.
    #[serde(default = "default_structural_rate")]
    pub insert_rate: f64,
    /// Chance, per spliced command, of switching the active parent.
    #[serde(default = "default_merge_switch_rate")]
    pub merge_switch_rate: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            field_rate: default_field_rate(),
            branch_drift_std: default_branch_drift_std(),
            truncate_rate: default_truncate_rate(),
            delete_rate: default_structural_rate(),
            swap_rate: default_structural_rate(),
            insert_rate: default_structural_rate(),
            merge_switch_rate: default_merge_switch_rate(),
        }
    }
}

fn default_field_rate() -> f64 {
    1e-4
}
fn default_branch_drift_std() -> f64 {
    2.0
}
fn default_truncate_rate() -> f64 {
    1e-3
}
fn default_structural_rate() -> f64 {
    1e-4
}
fn default_merge_switch_rate() -> f64 {
    0.05
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Survivor count must be non-zero")]
    NoSurvivors,
    #[error("Offspring per pair must be non-zero")]
    NoOffspring,
    #[error("Initial population must be non-zero")]
    EmptyPopulation,
    #[error("At least one trial list per generation is required")]
    NoTrials,
    #[error("List sizes must be non-zero (got {0})")]
    InvalidListSize(usize),
    #[error("Step cap must be non-zero")]
    ZeroStepCap,
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Standard deviation {name} = {value} must be finite and non-negative")]
    InvalidDeviation { name: &'static str, value: f64 },
    #[error("Mean {name} = {value} must be finite")]
    InvalidMean { name: &'static str, value: f64 },
    #[error("Size parameter {name} = {value} exceeds {MAX_SIZE}")]
    SizeTooLarge { name: &'static str, value: f64 },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExecutionConfig {
    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.interrupt_at == Some(0) {
            return Err(ConfigError::ZeroStepCap);
        }
        check_probability(name, self.chance_of_interruption)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { name, value })
    }
}

fn check_deviation(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDeviation { name, value })
    }
}

fn check_mean(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidMean { name, value })
    }
}

fn check_size(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value <= MAX_SIZE as f64 {
        Ok(())
    } else {
        Err(ConfigError::SizeTooLarge { name, value })
    }
}

impl EvolutionConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: EvolutionConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.execution.validate("execution.chance_of_interruption")?;
        self.finalization
            .execution
            .validate("finalization.execution.chance_of_interruption")?;
        if self.finalization.list_size == 0 {
            return Err(ConfigError::InvalidListSize(0));
        }
        check_size("finalization.list_size", self.finalization.list_size as f64)?;

        if self.population.survivors == 0 {
            return Err(ConfigError::NoSurvivors);
        }
        if self.population.offspring_per_pair == 0 {
            return Err(ConfigError::NoOffspring);
        }
        if self.population.initial_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }

        if self.trials.lists_per_generation == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.trials.min_list_size == 0 {
            return Err(ConfigError::InvalidListSize(0));
        }
        check_size("trials.min_list_size", self.trials.min_list_size as f64)?;
        check_mean("trials.list_size_mean", self.trials.list_size_mean)?;
        check_size("trials.list_size_mean", self.trials.list_size_mean)?;
        check_deviation("trials.list_size_std", self.trials.list_size_std)?;
        check_size("trials.list_size_std", self.trials.list_size_std)?;

        let generator = &self.generator;
        check_mean("generator.program_length_mean", generator.program_length_mean)?;
        check_size("generator.program_length_mean", generator.program_length_mean)?;
        check_deviation("generator.program_length_std", generator.program_length_std)?;
        check_size("generator.program_length_std", generator.program_length_std)?;
        check_mean("generator.branch_offset_mean", generator.branch_offset_mean)?;
        check_deviation("generator.branch_offset_std", generator.branch_offset_std)?;

        let mutation = &self.mutation;
        check_deviation("mutation.branch_drift_std", mutation.branch_drift_std)?;
        check_probability("mutation.field_rate", mutation.field_rate)?;
        check_probability("mutation.truncate_rate", mutation.truncate_rate)?;
        check_probability("mutation.delete_rate", mutation.delete_rate)?;
        check_probability("mutation.swap_rate", mutation.swap_rate)?;
        check_probability("mutation.insert_rate", mutation.insert_rate)?;
        check_probability("mutation.merge_switch_rate", mutation.merge_switch_rate)?;

        Ok(())
    }
}
