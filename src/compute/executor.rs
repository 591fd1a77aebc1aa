//! Conditional branching VM that runs a program against a working sequence.
//!
//! The machine state is two boolean flags, a pointer into the sequence and a
//! program counter that wraps around the program. Each step fetches one
//! command, checks its six guards and, if all pass, performs its operation.
//! Programs may loop forever, so every run is bounded by an [`Interruption`]
//! policy. A forcibly interrupted run returns its sequence sorted in
//! descending order, the lowest possible score.

use rand::Rng;

use crate::schema::{Command, ExecutionConfig, Operation, Program};

/// When a run is forcibly stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interruption {
    /// Stop once the step count reaches this value.
    AtStep(u64),
    /// Stop after any step with this probability.
    WithChance(f64),
}

impl From<&ExecutionConfig> for Interruption {
    fn from(config: &ExecutionConfig) -> Self {
        match config.interrupt_at {
            Some(cap) => Interruption::AtStep(cap),
            None => Interruption::WithChance(config.chance_of_interruption),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The program executed RETURN.
    Returned,
    /// The interruption policy fired.
    Interrupted,
}

/// Output of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution<T> {
    /// Final working sequence.
    pub sequence: Vec<T>,
    /// Number of steps executed.
    pub steps: u64,
    pub termination: Termination,
}

/// Result of a single VM step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Return,
}

/// Mutable machine state for one run.
#[derive(Debug, Clone)]
pub struct RuntimeState<T> {
    /// Private copy of the input.
    pub sequence: Vec<T>,
    pub flag0: bool,
    pub flag1: bool,
    /// Always within `[0, len - 1]` (0 for an empty sequence).
    pub pointer: usize,
    /// Index of the next command, reduced modulo program length on fetch.
    pub program_counter: usize,
    /// Current step, starting at 1.
    pub step_count: u64,
}

impl<T: Ord> RuntimeState<T> {
    pub fn new(sequence: Vec<T>) -> Self {
        Self {
            sequence,
            flag0: false,
            flag1: false,
            pointer: 0,
            program_counter: 0,
            step_count: 1,
        }
    }

    /// True iff the element under the pointer is greater than its right neighbour.
    #[inline]
    pub fn adjacent_inversion(&self) -> bool {
        self.pointer + 1 < self.sequence.len()
            && self.sequence[self.pointer] > self.sequence[self.pointer + 1]
    }

    #[inline]
    pub fn at_start(&self) -> bool {
        self.pointer == 0
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pointer + 1 == self.sequence.len()
    }

    /// Execute one command. An empty program returns immediately.
    ///
    /// The program counter is advanced before the operation runs, so branch
    /// offsets are relative to the following command.
    pub fn step<R: Rng + ?Sized>(&mut self, program: &Program, rng: &mut R) -> Flow {
        let commands = program.commands();
        if commands.is_empty() {
            return Flow::Return;
        }
        let index = self.program_counter % commands.len();
        let cmd = commands[index];
        self.program_counter = index + 1;

        if self.guards_pass(&cmd, rng) {
            self.apply(&cmd, commands.len())
        } else {
            Flow::Continue
        }
    }

    fn guards_pass<R: Rng + ?Sized>(&self, cmd: &Command, rng: &mut R) -> bool {
        cmd.flag0_cond.admits(self.flag0)
            && cmd.flag1_cond.admits(self.flag1)
            && cmd.compare_cond.admits_with(|| self.adjacent_inversion())
            && cmd.at_start_cond.admits(self.at_start())
            && cmd.at_end_cond.admits(self.at_end())
            && cmd.random_cond.admits_with(|| rng.r#gen::<bool>())
    }

    fn apply(&mut self, cmd: &Command, program_len: usize) -> Flow {
        match cmd.op {
            Operation::Branch => {
                // Equivalent modulo the program length, without overflow.
                let shift = cmd.branch_offset.rem_euclid(program_len as i64) as usize;
                self.program_counter = (self.program_counter % program_len + shift) % program_len;
            }
            Operation::Swap => {
                if self.pointer + 1 < self.sequence.len() {
                    self.sequence.swap(self.pointer, self.pointer + 1);
                }
            }
            Operation::Flip0 => self.flag0 = !self.flag0,
            Operation::Flip1 => self.flag1 = !self.flag1,
            Operation::Left => self.pointer = self.pointer.saturating_sub(1),
            Operation::Right => {
                if self.pointer + 1 < self.sequence.len() {
                    self.pointer += 1;
                }
            }
            Operation::Return => return Flow::Return,
        }
        Flow::Continue
    }

    fn finish(self, termination: Termination) -> Execution<T> {
        Execution {
            sequence: self.sequence,
            steps: self.step_count,
            termination,
        }
    }
}

/// Runs programs under a fixed interruption policy.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    interruption: Interruption,
}

impl Executor {
    pub fn new(interruption: Interruption) -> Self {
        Self { interruption }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(Interruption::from(config))
    }

    pub fn interruption(&self) -> Interruption {
        self.interruption
    }

    /// Run `program` on a private copy of `input`.
    ///
    /// An empty program returns the input unchanged after zero steps.
    pub fn run<T, R>(&self, program: &Program, input: &[T], rng: &mut R) -> Execution<T>
    where
        T: Ord + Clone,
        R: Rng + ?Sized,
    {
        let mut state = RuntimeState::new(input.to_vec());
        if program.is_empty() {
            state.step_count = 0;
            return state.finish(Termination::Returned);
        }

        loop {
            if state.step(program, rng) == Flow::Return {
                return state.finish(Termination::Returned);
            }
            if self.should_interrupt(state.step_count, rng) {
                state.sequence.sort_unstable_by(|a, b| b.cmp(a));
                return state.finish(Termination::Interrupted);
            }
            state.step_count += 1;
        }
    }

    fn should_interrupt<R: Rng + ?Sized>(&self, step_count: u64, rng: &mut R) -> bool {
        match self.interruption {
            Interruption::AtStep(cap) => step_count >= cap,
            Interruption::WithChance(chance) => rng.r#gen::<f64>() < chance,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::schema::Condition;

    fn program(commands: Vec<Command>) -> Program {
        Program::new(commands)
    }

    fn capped(cap: u64) -> Executor {
        Executor::new(Interruption::AtStep(cap))
    }

    #[test]
    fn test_return_is_immediate() {
        let mut rng = StdRng::seed_from_u64(1);
        let prog = program(vec![Command::unconditional(Operation::Return)]);

        let out = capped(1000).run(&prog, &[3, 1, 2], &mut rng);
        assert_eq!(out.sequence, vec![3, 1, 2]);
        assert_eq!(out.steps, 1);
        assert_eq!(out.termination, Termination::Returned);
    }

    #[test]
    fn test_swap_loop_is_interrupted_descending() {
        let mut rng = StdRng::seed_from_u64(1);
        let prog = program(vec![Command::unconditional(Operation::Swap)]);

        let out = capped(5).run(&prog, &[2, 1], &mut rng);
        assert_eq!(out.sequence, vec![2, 1]);
        assert_eq!(out.steps, 5);
        assert_eq!(out.termination, Termination::Interrupted);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let mut rng = StdRng::seed_from_u64(1);
        let input = vec![1, 2, 3];
        let prog = program(vec![Command::unconditional(Operation::Swap)]);

        let out = capped(3).run(&prog, &input, &mut rng);
        assert_eq!(input, vec![1, 2, 3]);
        assert_eq!(out.sequence, vec![3, 2, 1]);
    }

    #[test]
    fn test_guarded_gnome_sort() {
        let mut rng = StdRng::seed_from_u64(1);
        let flag0_set = |op| Command {
            flag0_cond: Condition::RequireTrue,
            ..Command::unconditional(op)
        };
        // On an inversion: mark, swap, step back, unmark. Otherwise step right or stop at the end.
        let prog = program(vec![
            Command {
                compare_cond: Condition::RequireTrue,
                ..Command::unconditional(Operation::Flip0)
            },
            flag0_set(Operation::Swap),
            flag0_set(Operation::Left),
            flag0_set(Operation::Flip0),
            Command {
                at_end_cond: Condition::RequireTrue,
                ..Command::unconditional(Operation::Return)
            },
            Command {
                compare_cond: Condition::RequireFalse,
                at_end_cond: Condition::RequireFalse,
                ..Command::unconditional(Operation::Right)
            },
        ]);

        let out = capped(100_000).run(&prog, &[4, 2, 5, 1, 3], &mut rng);
        assert_eq!(out.termination, Termination::Returned);
        assert_eq!(out.sequence, vec![1, 2, 3, 4, 5]);
        assert_eq!(out.steps, 71);
    }

    #[test]
    fn test_branch_is_relative_to_next_command() {
        let mut rng = StdRng::seed_from_u64(1);
        // Branch +1 skips the FLIP_0 and lands on RETURN.
        let prog = program(vec![
            Command::branch(1),
            Command::unconditional(Operation::Flip0),
            Command::unconditional(Operation::Return),
        ]);
        let mut state = RuntimeState::new(vec![1, 2]);
        assert_eq!(state.step(&prog, &mut rng), Flow::Continue);
        assert_eq!(state.program_counter, 2);
        assert_eq!(state.step(&prog, &mut rng), Flow::Return);
        assert!(!state.flag0);
    }

    #[test]
    fn test_branch_wraps_around() {
        let mut rng = StdRng::seed_from_u64(1);
        let prog = program(vec![
            Command::unconditional(Operation::Flip1),
            Command::branch(-7),
            Command::unconditional(Operation::Return),
        ]);
        let mut state = RuntimeState::new(vec![0]);
        state.program_counter = 1;
        state.step(&prog, &mut rng);
        // (2 - 7) mod 3 == 1
        assert_eq!(state.program_counter, 1);

        let far = program(vec![Command::branch(i64::MAX), Command::branch(i64::MIN)]);
        let mut state = RuntimeState::new(vec![0]);
        for _ in 0..10 {
            state.step(&far, &mut rng);
            assert!(state.program_counter < far.len());
        }
    }

    #[test]
    fn test_flags_gate_commands() {
        let mut rng = StdRng::seed_from_u64(1);
        let prog = program(vec![
            Command {
                flag1_cond: Condition::RequireTrue,
                ..Command::unconditional(Operation::Return)
            },
            Command::unconditional(Operation::Flip1),
        ]);
        let out = capped(100).run(&prog, &[1], &mut rng);
        assert_eq!(out.termination, Termination::Returned);
        assert_eq!(out.steps, 3);
    }

    #[test]
    fn test_empty_and_single_sequences() {
        let mut rng = StdRng::seed_from_u64(1);
        let prog = program(vec![
            Command::unconditional(Operation::Swap),
            Command::unconditional(Operation::Right),
            Command::unconditional(Operation::Left),
        ]);

        let empty: Vec<u32> = Vec::new();
        let out = capped(10).run(&prog, &empty, &mut rng);
        assert!(out.sequence.is_empty());
        assert_eq!(out.steps, 10);

        let out = capped(10).run(&prog, &[7], &mut rng);
        assert_eq!(out.sequence, vec![7]);
    }

    #[test]
    fn test_empty_program_returns_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = capped(10).run(&Program::default(), &[2, 1], &mut rng);
        assert_eq!(out.sequence, vec![2, 1]);
        assert_eq!(out.steps, 0);
        assert_eq!(out.termination, Termination::Returned);
    }

    #[test]
    fn test_certain_chance_interrupts_first_step() {
        let mut rng = StdRng::seed_from_u64(1);
        let prog = program(vec![Command::unconditional(Operation::Flip0)]);
        let out = Executor::new(Interruption::WithChance(1.0)).run(&prog, &[1, 3, 2], &mut rng);
        assert_eq!(out.steps, 1);
        assert_eq!(out.sequence, vec![3, 2, 1]);
        assert_eq!(out.termination, Termination::Interrupted);
    }

    #[test]
    fn test_interruption_from_config() {
        let mut config = ExecutionConfig::default();
        assert_eq!(Interruption::from(&config), Interruption::AtStep(1000));
        config.interrupt_at = None;
        config.chance_of_interruption = 0.25;
        assert_eq!(
            Executor::from_config(&config).interruption(),
            Interruption::WithChance(0.25)
        );
    }

    fn random_gated(random_cond: Condition) -> Program {
        program(vec![
            Command {
                random_cond,
                ..Command::unconditional(Operation::Return)
            },
            Command::unconditional(Operation::Flip0),
        ])
    }

    #[test]
    fn test_random_guard_fires_on_some_steps() {
        for random_cond in [Condition::RequireTrue, Condition::RequireFalse] {
            let prog = random_gated(random_cond);
            let steps: Vec<u64> = (0..64)
                .map(|seed| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let out = capped(1000).run(&prog, &[2, 1], &mut rng);
                    assert_eq!(out.termination, Termination::Returned);
                    out.steps
                })
                .collect();

            assert!(steps.iter().any(|&s| s == 1), "{random_cond:?} never fired first");
            assert!(steps.iter().any(|&s| s > 1), "{random_cond:?} always fired first");
            // RETURN only sits at odd steps.
            assert!(steps.iter().all(|&s| s % 2 == 1));
        }
    }

    #[test]
    fn test_unconditional_random_guard_always_fires() {
        let prog = random_gated(Condition::Unconditional);
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = capped(1000).run(&prog, &[2, 1], &mut rng);
            assert_eq!(out.steps, 1);
            assert_eq!(out.termination, Termination::Returned);
        }
    }

    fn arb_condition() -> impl Strategy<Value = Condition> {
        prop::sample::select(Condition::ALL.to_vec())
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        (
            prop::array::uniform6(arb_condition()),
            prop::sample::select(Operation::ALL.to_vec()),
            -40i64..40,
        )
            .prop_map(|(conds, op, branch_offset)| Command {
                flag0_cond: conds[0],
                flag1_cond: conds[1],
                compare_cond: conds[2],
                at_start_cond: conds[3],
                at_end_cond: conds[4],
                random_cond: conds[5],
                op,
                branch_offset,
            })
    }

    fn arb_program() -> impl Strategy<Value = Program> {
        prop::collection::vec(arb_command(), 1..40).prop_map(Program::new)
    }

    proptest! {
        /// Every run stops within the step cap.
        #[test]
        fn run_respects_step_cap(
            prog in arb_program(),
            input in prop::collection::vec(0u32..50, 0..30),
            cap in 1u64..500,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = capped(cap).run(&prog, &input, &mut rng);
            prop_assert!(out.steps <= cap);
            prop_assert_eq!(out.sequence.len(), input.len());
        }

        /// Interrupted output is always in descending order.
        #[test]
        fn interrupted_output_is_descending(
            prog in arb_program(),
            input in prop::collection::vec(0u32..50, 0..30),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = capped(64).run(&prog, &input, &mut rng);
            if out.termination == Termination::Interrupted {
                prop_assert!(out.sequence.windows(2).all(|w| w[0] >= w[1]));
            }
        }

        /// Pointer and program counter stay in range for any program.
        #[test]
        fn state_stays_in_bounds(
            prog in arb_program(),
            input in prop::collection::vec(0u32..50, 1..30),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = RuntimeState::new(input.clone());
            for _ in 0..200 {
                if state.step(&prog, &mut rng) == Flow::Return {
                    break;
                }
                prop_assert!(state.pointer < input.len());
                prop_assert!(state.program_counter <= prog.len());
            }
        }

        /// LEFT/RIGHT alone never push the pointer out of range.
        #[test]
        fn pointer_clamped_under_moves(
            moves in prop::collection::vec(any::<bool>(), 1..200),
            len in 1usize..20,
        ) {
            let mut rng = StdRng::seed_from_u64(0);
            let left = program(vec![Command::unconditional(Operation::Left)]);
            let right = program(vec![Command::unconditional(Operation::Right)]);
            let mut state = RuntimeState::new((0..len).collect::<Vec<_>>());
            for go_right in moves {
                state.step(if go_right { &right } else { &left }, &mut rng);
                prop_assert!(state.pointer < len);
            }
        }
    }
}
