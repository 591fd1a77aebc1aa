//! Program manipulation utilities for evolutionary search.
//!
//! Provides random generation, mutation and splicing of programs.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::schema::{
    Command, Condition, GeneratorConfig, MAX_SIZE, MutationConfig, Operation, Program,
};

/// Random number generator wrapper for program operations.
///
/// Also usable directly as an [`RngCore`], which is how the VM and trial
/// sampling draw their random bits.
#[derive(Debug, Clone)]
pub struct ProgramRng {
    rng: StdRng,
    generator: GeneratorConfig,
    mutation: MutationConfig,
}

impl ProgramRng {
    /// Create from seed.
    pub fn new(seed: u64, generator: GeneratorConfig, mutation: MutationConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            generator,
            mutation,
        }
    }

    /// Create with random seed.
    pub fn random(generator: GeneratorConfig, mutation: MutationConfig) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            generator,
            mutation,
        }
    }

    /// Sample from a Gaussian.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let noise: f64 = self.rng.sample(StandardNormal);
        mean + noise * std_dev
    }

    /// Sample from a Gaussian and round to the nearest integer.
    pub fn rounded_gaussian(&mut self, mean: f64, std_dev: f64) -> i64 {
        self.gaussian(mean, std_dev).round() as i64
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.r#gen::<f64>() < probability
    }

    fn random_condition(&mut self) -> Condition {
        Condition::ALL[self.rng.gen_range(0..Condition::ALL.len())]
    }

    fn random_operation(&mut self) -> Operation {
        Operation::ALL[self.rng.gen_range(0..Operation::ALL.len())]
    }

    /// Generate a command with uniform guards and operation.
    pub fn random_command(&mut self) -> Command {
        Command {
            flag0_cond: self.random_condition(),
            flag1_cond: self.random_condition(),
            compare_cond: self.random_condition(),
            at_start_cond: self.random_condition(),
            at_end_cond: self.random_condition(),
            random_cond: self.random_condition(),
            op: self.random_operation(),
            branch_offset: self.rounded_gaussian(
                self.generator.branch_offset_mean,
                self.generator.branch_offset_std,
            ),
        }
    }

    /// Generate a program of Gaussian length, clamped to `[1, MAX_SIZE]`.
    pub fn random_program(&mut self) -> Program {
        let len = self
            .rounded_gaussian(
                self.generator.program_length_mean,
                self.generator.program_length_std,
            )
            .clamp(1, MAX_SIZE as i64) as usize;
        (0..len).map(|_| self.random_command()).collect()
    }

    /// Resample each field of `cmd` independently with probability `field_rate`.
    ///
    /// Guards and the operation are redrawn uniformly; the branch offset
    /// drifts around its current value.
    pub fn mutate_command(&mut self, cmd: &Command) -> Command {
        let rate = self.mutation.field_rate;
        let mut next = *cmd;
        for cond in [
            &mut next.flag0_cond,
            &mut next.flag1_cond,
            &mut next.compare_cond,
            &mut next.at_start_cond,
            &mut next.at_end_cond,
            &mut next.random_cond,
        ] {
            if self.chance(rate) {
                *cond = self.random_condition();
            }
        }
        if self.chance(rate) {
            next.op = self.random_operation();
        }
        if self.chance(rate) {
            next.branch_offset =
                self.rounded_gaussian(cmd.branch_offset as f64, self.mutation.branch_drift_std);
        }
        next
    }

    /// Apply structural and point mutations in a single left-to-right walk.
    ///
    /// At each position the program may be cut off (past the first command),
    /// the command may be deleted (while more than one remains) or swapped
    /// with its successor, and the command at the position is then mutated.
    /// A random command may be prepended before the walk and after every
    /// position. The result is never empty unless the input was.
    pub fn mutate_program(&mut self, program: &Program) -> Program {
        let mut cmds = program.commands().to_vec();
        let insert_rate = self.mutation.insert_rate;

        if self.chance(insert_rate) {
            cmds.insert(0, self.random_command());
        }

        let mut i = 0;
        while i < cmds.len() {
            if i > 0 && self.chance(self.mutation.truncate_rate) {
                cmds.truncate(i);
                break;
            }
            if cmds.len() > 1 && self.chance(self.mutation.delete_rate) {
                cmds.remove(i);
                continue;
            }
            if i + 1 < cmds.len() && self.chance(self.mutation.swap_rate) {
                cmds.swap(i, i + 1);
            }
            cmds[i] = self.mutate_command(&cmds[i]);
            i += 1;

            // Prepending shifts the walk back by one, so the command just
            // mutated is visited again.
            if self.chance(insert_rate) {
                cmds.insert(0, self.random_command());
            }
        }

        Program::new(cmds)
    }

    /// Interleave runs of commands from both parents without mutating.
    ///
    /// Every command of both parents appears in the child exactly once, in
    /// parent order; only the interleaving is random.
    pub fn splice(&mut self, first: &Program, second: &Program) -> Program {
        let (mut active, mut idle) = if self.rng.gen_bool(0.5) {
            (second.commands(), first.commands())
        } else {
            (first.commands(), second.commands())
        };
        let (mut active_at, mut idle_at) = (0, 0);
        let mut child = Vec::with_capacity(active.len() + idle.len());

        while active_at < active.len() || idle_at < idle.len() {
            if self.chance(self.mutation.merge_switch_rate) {
                std::mem::swap(&mut active, &mut idle);
                std::mem::swap(&mut active_at, &mut idle_at);
            }
            if active_at >= active.len() {
                std::mem::swap(&mut active, &mut idle);
                std::mem::swap(&mut active_at, &mut idle_at);
            }
            child.push(active[active_at]);
            active_at += 1;
        }

        Program::new(child)
    }

    /// Splice two programs and mutate the child.
    pub fn merge(&mut self, first: &Program, second: &Program) -> Program {
        let child = self.splice(first, second);
        self.mutate_program(&child)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

impl RngCore for ProgramRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
