//! Sortedness scoring and multi-trial evaluation of programs.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::compute::Executor;
use crate::schema::{MAX_SIZE, Program, TrialConfig};

use super::genome::ProgramRng;

/// Fraction of ordered pairs `(i, j)`, `i < j`, with `seq[i] < seq[j]`.
///
/// Ascending input scores 1.0 and descending input 0.0; equal elements count
/// toward neither. Sequences of length 0 or 1 are trivially sorted and score 1.0.
pub fn sortedness<T: Ord>(seq: &[T]) -> f64 {
    let n = seq.len();
    if n < 2 {
        return 1.0;
    }

    let ordered: usize = seq
        .iter()
        .enumerate()
        .map(|(i, a)| seq[i + 1..].iter().filter(|b| a < *b).count())
        .sum();

    2.0 * ordered as f64 / (n * (n - 1)) as f64
}

/// A batch of shuffled permutations used to evaluate one generation.
#[derive(Debug, Clone)]
pub struct TrialSet {
    lists: Vec<Vec<u32>>,
}

impl TrialSet {
    pub fn new(lists: Vec<Vec<u32>>) -> Self {
        Self { lists }
    }

    /// Draw list sizes from the configured Gaussian and shuffle `0..size` for each.
    pub fn sample(config: &TrialConfig, rng: &mut ProgramRng) -> Self {
        let lists = (0..config.lists_per_generation)
            .map(|_| {
                let size = rng
                    .rounded_gaussian(config.list_size_mean, config.list_size_std)
                    .max(config.min_list_size as i64) as usize;
                shuffled_range(size, rng)
            })
            .collect();
        Self { lists }
    }

    /// A single shuffled list of a fixed size.
    pub fn single(size: usize, rng: &mut ProgramRng) -> Self {
        Self {
            lists: vec![shuffled_range(size, rng)],
        }
    }

    pub fn lists(&self) -> &[Vec<u32>] {
        &self.lists
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    /// Normalizer for cumulative execution lengths.
    pub fn sum_of_squared_sizes(&self) -> u64 {
        self.lists.iter().map(|l| (l.len() * l.len()) as u64).sum()
    }
}

/// Shuffled `0..size`, with `size` capped at [`MAX_SIZE`].
fn shuffled_range<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Vec<u32> {
    let end = u32::try_from(size.min(MAX_SIZE)).unwrap_or(u32::MAX);
    let mut list: Vec<u32> = (0..end).collect();
    list.shuffle(rng);
    list
}

/// Score and length summed over every list of a trial set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrialTotals {
    pub score: f64,
    pub execution_length: u64,
}

/// Runs a program over a trial set and accumulates its fitness.
#[derive(Debug, Clone, Copy)]
pub struct FitnessEvaluator {
    executor: Executor,
}

impl FitnessEvaluator {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    /// Run `program` once per trial list.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        program: &Program,
        trials: &TrialSet,
        rng: &mut R,
    ) -> TrialTotals {
        trials
            .lists()
            .iter()
            .fold(TrialTotals::default(), |mut totals, list| {
                let execution = self.executor.run(program, list, rng);
                totals.score += sortedness(&execution.sequence);
                totals.execution_length += execution.steps;
                totals
            })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::compute::Interruption;
    use crate::schema::{Command, Operation};

    #[test]
    fn test_sortedness_extremes() {
        assert_eq!(sortedness(&[1, 2, 3, 4, 5]), 1.0);
        assert_eq!(sortedness(&[5, 4, 3, 2, 1]), 0.0);
        assert!((sortedness(&[3, 1, 2]) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_sortedness_ties_count_toward_neither() {
        assert_eq!(sortedness(&[7, 7, 7]), 0.0);
        assert!((sortedness(&[1, 1, 2]) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_sortedness_degenerate_lengths() {
        let empty: [u32; 0] = [];
        assert_eq!(sortedness(&empty), 1.0);
        assert_eq!(sortedness(&[42]), 1.0);
    }

    #[test]
    fn test_trial_sampling_respects_minimum() {
        let mut rng = ProgramRng::new(3, Default::default(), Default::default());
        let config = TrialConfig {
            lists_per_generation: 50,
            list_size_mean: 0.0,
            list_size_std: 1.0,
            min_list_size: 2,
        };
        let trials = TrialSet::sample(&config, &mut rng);

        assert_eq!(trials.lists().len(), 50);
        assert!(trials.sizes().iter().all(|&s| s >= 2));
        for list in trials.lists() {
            let mut sorted = list.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..list.len() as u32).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_single_list_is_capped() {
        let mut rng = ProgramRng::new(3, Default::default(), Default::default());
        let trials = TrialSet::single(MAX_SIZE + 5, &mut rng);
        assert_eq!(trials.sizes(), vec![MAX_SIZE]);
    }

    #[test]
    fn test_sum_of_squared_sizes() {
        let trials = TrialSet::new(vec![vec![0, 1], vec![2, 0, 1]]);
        assert_eq!(trials.sum_of_squared_sizes(), 13);
        assert_eq!(trials.sizes(), vec![2, 3]);
    }

    #[test]
    fn test_evaluate_accumulates_over_lists() {
        let mut rng = StdRng::seed_from_u64(0);
        let evaluator = FitnessEvaluator::new(Executor::new(Interruption::AtStep(100)));
        let program = Program::new(vec![Command::unconditional(Operation::Return)]);
        let trials = TrialSet::new(vec![vec![0, 1, 2], vec![2, 1, 0], vec![1, 0]]);

        let totals = evaluator.evaluate(&program, &trials, &mut rng);
        assert!((totals.score - 1.0).abs() < 1e-12);
        assert_eq!(totals.execution_length, 3);
    }

    proptest! {
        /// A permutation and its reverse split the ordered pairs between them.
        #[test]
        fn score_plus_reverse_is_one(
            perm in (2usize..40).prop_flat_map(|n| Just((0..n as u32).collect::<Vec<_>>()).prop_shuffle()),
        ) {
            let mut reversed = perm.clone();
            reversed.reverse();
            prop_assert!((sortedness(&perm) + sortedness(&reversed) - 1.0).abs() < 1e-9);
        }

        #[test]
        fn score_is_normalized(seq in prop::collection::vec(0u8..10, 0..40)) {
            let score = sortedness(&seq);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
