//! Generational driver: evaluation, truncation selection and breeding.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::compute::Executor;
use crate::schema::{
    EntrySummary, EvolutionConfig, EvolutionHistory, EvolutionResult, FinalEntry, FinalReport,
    GenerationReport, Program, StopReason,
};

use super::fitness::{FitnessEvaluator, TrialSet};
use super::genome::ProgramRng;

/// A program and its statistics for the current generation.
#[derive(Debug, Clone)]
pub struct PopulationEntry {
    pub program: Program,
    pub cumulative_score: f64,
    pub cumulative_length: u64,
    pub code_size: usize,
}

impl PopulationEntry {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            cumulative_score: 0.0,
            cumulative_length: 0,
            code_size: 0,
        }
    }

    fn reset(&mut self) {
        self.cumulative_score = 0.0;
        self.cumulative_length = 0;
        self.code_size = self.program.len();
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            score: self.cumulative_score,
            execution_length: self.cumulative_length,
            code_size: self.code_size,
        }
    }
}

/// Generation ranking: higher score, then smaller length bucket, then smaller size bucket.
///
/// Lengths are floor-divided by `length_norm`, so runs within the same
/// multiple of the norm tie and code size decides between them.
fn generation_order(a: &PopulationEntry, b: &PopulationEntry, length_norm: u64) -> CmpOrdering {
    let length_bucket = |e: &PopulationEntry| e.cumulative_length / length_norm;
    let size_bucket = |e: &PopulationEntry| (e.code_size / 10).max(2);
    b.cumulative_score
        .total_cmp(&a.cumulative_score)
        .then_with(|| length_bucket(a).cmp(&length_bucket(b)))
        .then_with(|| size_bucket(a).cmp(&size_bucket(b)))
}

/// Final ranking: higher score, then raw length, then raw size.
fn final_order(a: &PopulationEntry, b: &PopulationEntry) -> CmpOrdering {
    b.cumulative_score
        .total_cmp(&a.cumulative_score)
        .then_with(|| a.cumulative_length.cmp(&b.cumulative_length))
        .then_with(|| a.code_size.cmp(&b.code_size))
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: ProgramRng,
    evaluator: FitnessEvaluator,
    population: Vec<PopulationEntry>,
    history: EvolutionHistory,
    generation: usize,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(config: EvolutionConfig) -> Self {
        let generator = config.generator.clone();
        let mutation = config.mutation.clone();
        let rng = match config.random_seed {
            Some(seed) => ProgramRng::new(seed, generator, mutation),
            None => ProgramRng::random(generator, mutation),
        };
        let evaluator = FitnessEvaluator::new(Executor::from_config(&config.execution));

        Self {
            config,
            rng,
            evaluator,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn population(&self) -> &[PopulationEntry] {
        &self.population
    }

    /// Generations completed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Replace the population with fresh random programs.
    pub fn initialize(&mut self) {
        self.generation = 0;
        self.population = (0..self.config.population.initial_size)
            .map(|_| PopulationEntry::new(self.rng.random_program()))
            .collect();
        log::debug!("Generated {} random programs", self.population.len());
    }

    /// Seed the population with given programs instead of random ones.
    pub fn initialize_with(&mut self, programs: impl IntoIterator<Item = Program>) {
        self.generation = 0;
        self.population = programs.into_iter().map(PopulationEntry::new).collect();
    }

    /// Run every entry over every trial list, resetting its statistics first.
    fn evaluate_population(&mut self, evaluator: &FitnessEvaluator, trials: &TrialSet) {
        // One RNG per entry, drawn up front so parallel order does not matter.
        let seeds: Vec<u64> = (0..self.population.len())
            .map(|_| self.rng.next_seed())
            .collect();

        self.population
            .par_iter_mut()
            .zip(seeds)
            .for_each(|(entry, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                entry.reset();
                let totals = evaluator.evaluate(&entry.program, trials, &mut rng);
                entry.cumulative_score = totals.score;
                entry.cumulative_length = totals.execution_length;
            });
    }

    /// Evaluate, rank and breed one generation.
    pub fn step_generation(&mut self) -> GenerationReport {
        let start = Instant::now();
        let trials = TrialSet::sample(&self.config.trials, &mut self.rng);
        let evaluator = self.evaluator;
        self.evaluate_population(&evaluator, &trials);

        let length_norm = trials.sum_of_squared_sizes().max(1);
        self.population
            .sort_by(|a, b| generation_order(a, b, length_norm));

        let evaluated = self.population.len();
        let lowest_score = self
            .population
            .last()
            .map_or(0.0, |e| e.cumulative_score);
        self.population.truncate(self.config.population.survivors);

        let survivors: Vec<EntrySummary> =
            self.population.iter().map(PopulationEntry::summary).collect();
        let best_program = self
            .population
            .first()
            .map(|e| e.program.clone())
            .unwrap_or_default();

        self.breed();
        self.generation += 1;

        let report = GenerationReport {
            generation: self.generation,
            list_sizes: trials.sizes(),
            evaluated,
            lowest_score,
            survivors,
            best_program,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        self.history.record(&report);

        if let Some(best) = report.best() {
            log::info!(
                "Generation {}: best score {:.3} (length {}, size {}), lowest {:.3}",
                report.generation,
                best.score,
                best.execution_length,
                best.code_size,
                report.lowest_score
            );
        }

        report
    }

    /// Replace the ranked survivors with their offspring.
    ///
    /// Every unordered survivor pair `(i, j)`, `i <= j`, yields
    /// `offspring_per_pair` children: mutants of `i` when `i == j`, merges
    /// of `i` and `j` otherwise.
    fn breed(&mut self) {
        let per_pair = self.config.population.offspring_per_pair;
        let survivors: Vec<Program> = self
            .population
            .drain(..)
            .map(|e| e.program)
            .collect();

        let pairs = survivors.len() * (survivors.len() + 1) / 2;
        let mut next_gen = Vec::with_capacity(pairs * per_pair);
        for (i, first) in survivors.iter().enumerate() {
            for (j, second) in survivors.iter().enumerate().skip(i) {
                for _ in 0..per_pair {
                    let child = if i == j {
                        self.rng.mutate_program(first)
                    } else {
                        self.rng.merge(first, second)
                    };
                    next_gen.push(PopulationEntry::new(child));
                }
            }
        }

        log::debug!(
            "Bred {} offspring from {} survivors",
            next_gen.len(),
            survivors.len()
        );
        self.population = next_gen;
    }

    /// Score the current population once on a single list under relaxed limits.
    ///
    /// Ranks by raw score, length and size and keeps the top survivors.
    pub fn finalize(&mut self) -> FinalReport {
        let start = Instant::now();
        let final_config = &self.config.finalization;
        let trials = TrialSet::single(final_config.list_size, &mut self.rng);
        let evaluator = FitnessEvaluator::new(Executor::from_config(&final_config.execution));
        let list_size = final_config.list_size;
        self.evaluate_population(&evaluator, &trials);

        self.population.sort_by(final_order);
        let evaluated = self.population.len();
        let lowest_score = self
            .population
            .last()
            .map_or(0.0, |e| e.cumulative_score);
        self.population.truncate(self.config.population.survivors);

        let survivors = self
            .population
            .iter()
            .map(|e| FinalEntry {
                summary: e.summary(),
                program: e.program.clone(),
            })
            .collect();

        let report = FinalReport {
            list_size,
            evaluated,
            lowest_score,
            survivors,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        log::info!(
            "Final pass on a list of length {}: {} programs, lowest score {:.3}",
            report.list_size,
            report.evaluated,
            report.lowest_score
        );
        report
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(limit) = self.config.population.max_generations
            && self.generation >= limit
        {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run evolution with progress callback.
    ///
    /// Cancellation is observed between generations; the generation in
    /// flight completes and the final pass then runs on its offspring.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> EvolutionResult
    where
        F: FnMut(&GenerationReport),
    {
        let start_time = Instant::now();

        self.initialize();

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            let report = self.step_generation();
            callback(&report);
        };
        log::info!(
            "Stopped after {} generations ({:?})",
            self.generation,
            stop_reason
        );

        let final_report = self.finalize();

        EvolutionResult {
            stop_reason,
            generations: self.generation,
            final_report,
            history: self.history.clone(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}
