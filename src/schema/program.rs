//! Instruction set types: guards, operations, commands and programs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tri-state guard on a boolean condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Condition {
    /// Always passes.
    #[default]
    Unconditional,
    /// Passes iff the condition is false.
    RequireFalse,
    /// Passes iff the condition is true.
    RequireTrue,
}

impl Condition {
    /// All guard values, in generation order.
    pub const ALL: [Condition; 3] = [
        Condition::Unconditional,
        Condition::RequireFalse,
        Condition::RequireTrue,
    ];

    /// Check the guard against an already known condition value.
    #[inline]
    pub fn admits(self, actual: bool) -> bool {
        match self {
            Condition::Unconditional => true,
            Condition::RequireFalse => !actual,
            Condition::RequireTrue => actual,
        }
    }

    /// Check the guard against a lazily computed condition.
    ///
    /// `actual` is only invoked when the guard is not unconditional, so a
    /// random draw behind it is skipped for unconditional guards.
    #[inline]
    pub fn admits_with(self, actual: impl FnOnce() -> bool) -> bool {
        match self {
            Condition::Unconditional => true,
            Condition::RequireFalse => !actual(),
            Condition::RequireTrue => actual(),
        }
    }

    fn symbol(self) -> char {
        match self {
            Condition::Unconditional => '-',
            Condition::RequireFalse => '0',
            Condition::RequireTrue => '1',
        }
    }
}

/// Operation performed when every guard of a command passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Jump by `branch_offset`, relative to the following command.
    Branch,
    /// Exchange the element under the pointer with its right neighbour.
    Swap,
    /// Invert flag 0.
    Flip0,
    /// Invert flag 1.
    Flip1,
    /// Move the pointer one position left.
    Left,
    /// Move the pointer one position right.
    Right,
    /// Stop and return the working sequence as-is.
    Return,
}

impl Operation {
    /// All operations, in generation order.
    pub const ALL: [Operation; 7] = [
        Operation::Branch,
        Operation::Swap,
        Operation::Flip0,
        Operation::Flip1,
        Operation::Left,
        Operation::Right,
        Operation::Return,
    ];

    fn mnemonic(self) -> &'static str {
        match self {
            Operation::Branch => "BRANCH",
            Operation::Swap => "SWAP",
            Operation::Flip0 => "FLIP_0",
            Operation::Flip1 => "FLIP_1",
            Operation::Left => "LEFT",
            Operation::Right => "RIGHT",
            Operation::Return => "RETURN",
        }
    }
}

/// One VM instruction.
///
/// Commands are plain `Copy` values; genetic operators build new commands
/// rather than editing existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Guard on flag 0.
    pub flag0_cond: Condition,
    /// Guard on flag 1.
    pub flag1_cond: Condition,
    /// Guard on `seq[pointer] > seq[pointer + 1]`.
    pub compare_cond: Condition,
    /// Guard on `pointer == 0`.
    pub at_start_cond: Condition,
    /// Guard on `pointer + 1 == len`.
    pub at_end_cond: Condition,
    /// Guard on a fresh random bit.
    pub random_cond: Condition,
    /// What to do when all guards pass.
    pub op: Operation,
    /// Jump distance, only read by [`Operation::Branch`].
    pub branch_offset: i64,
}

impl Command {
    /// A command with every guard unconditional.
    pub fn unconditional(op: Operation) -> Self {
        Self {
            flag0_cond: Condition::Unconditional,
            flag1_cond: Condition::Unconditional,
            compare_cond: Condition::Unconditional,
            at_start_cond: Condition::Unconditional,
            at_end_cond: Condition::Unconditional,
            random_cond: Condition::Unconditional,
            op,
            branch_offset: 0,
        }
    }

    /// Unconditional branch by `offset`.
    pub fn branch(offset: i64) -> Self {
        Self {
            branch_offset: offset,
            ..Self::unconditional(Operation::Branch)
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}{}{}{}{}{}] {}",
            self.flag0_cond.symbol(),
            self.flag1_cond.symbol(),
            self.compare_cond.symbol(),
            self.at_start_cond.symbol(),
            self.at_end_cond.symbol(),
            self.random_cond.symbol(),
            self.op.mnemonic()
        )?;
        if self.op == Operation::Branch {
            write!(f, " {:+}", self.branch_offset)?;
        }
        Ok(())
    }
}

/// An ordered sequence of commands, the unit of evolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    commands: Vec<Command>,
}

impl Program {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }
}

impl From<Vec<Command>> for Program {
    fn from(commands: Vec<Command>) -> Self {
        Self::new(commands)
    }
}

impl FromIterator<Command> for Program {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            writeln!(f, "{i:4}: {cmd}")?;
        }
        Ok(())
    }
}
