//! # MIR Terminators
//!
//! This module defines terminators, which end basic blocks and transfer control flow.
//! Every basic block must end with exactly one terminator.

use std::collections::HashSet;

use crate::{BasicBlockId, PrettyPrint, Value};

/// A terminator ends a basic block and transfers control
///
/// Every basic block MUST end with exactly one terminator.
/// Terminators are the only instructions that can change control flow.
///
/// # Design Notes
///
/// - Each terminator specifies its target blocks explicitly
/// - Conditional branches specify both targets (taken/not taken)
/// - Return terminators end function execution
/// - Unreachable terminators indicate impossible code paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump: `jump target`
    /// Always transfers control to the target block
    Jump { target: BasicBlockId },

    /// Conditional branch: `if condition then jump then_target else jump else_target`
    /// Transfers control based on the condition value
    If {
        condition: Value,
        then_target: BasicBlockId,
        else_target: BasicBlockId,
    },

    /// Function return: `return values...`
    /// Ends function execution; empty for void functions
    Return { values: Vec<Value> },

    /// Unreachable code: indicates this point should never be reached
    /// Used as a placeholder during construction and for optimization
    Unreachable,
}

impl Terminator {
    /// Creates a new jump terminator
    pub const fn jump(target: BasicBlockId) -> Self {
        Self::Jump { target }
    }

    /// Creates a new conditional branch terminator
    pub const fn branch(
        condition: Value,
        then_target: BasicBlockId,
        else_target: BasicBlockId,
    ) -> Self {
        Self::If {
            condition,
            then_target,
            else_target,
        }
    }

    /// Creates a new return terminator with a single value
    pub fn return_value(value: Value) -> Self {
        Self::Return {
            values: vec![value],
        }
    }

    /// Creates a new return terminator with multiple values
    pub const fn return_values(values: Vec<Value>) -> Self {
        Self::Return { values }
    }

    /// Creates a new void return terminator
    pub const fn return_void() -> Self {
        Self::Return { values: Vec::new() }
    }

    /// Creates an unreachable terminator
    pub const fn unreachable() -> Self {
        Self::Unreachable
    }

    /// Returns all basic block targets of this terminator
    ///
    /// This is used for CFG construction and analysis.
    pub fn target_blocks(&self) -> Vec<BasicBlockId> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::If {
                then_target,
                else_target,
                ..
            } => vec![*then_target, *else_target],
            Self::Return { .. } | Self::Unreachable => vec![],
        }
    }

    /// Returns all values used by this terminator
    pub fn used_values(&self) -> HashSet<crate::ValueId> {
        let mut used = HashSet::new();

        match self {
            Self::Jump { .. } | Self::Unreachable => {}

            Self::If { condition, .. } => {
                if let Value::Operand(id) = condition {
                    used.insert(*id);
                }
            }

            Self::Return { values } => {
                for value in values {
                    if let Value::Operand(id) = value {
                        used.insert(*id);
                    }
                }
            }
        }

        used
    }

    /// Replaces every use of `from` with `to`, returning the replacement count
    pub fn replace_value_uses(&mut self, from: crate::ValueId, to: Value) -> usize {
        let mut replaced = 0;
        let mut patch = |value: &mut Value| {
            if *value == Value::Operand(from) {
                *value = to;
                replaced += 1;
            }
        };

        match self {
            Self::Jump { .. } | Self::Unreachable => {}

            Self::If { condition, .. } => patch(condition),

            Self::Return { values } => {
                for value in values {
                    patch(value);
                }
            }
        }

        replaced
    }
}

impl PrettyPrint for Terminator {
    fn pretty_print(&self, _indent: usize) -> String {
        match self {
            Self::Jump { target } => {
                format!("jump bb{}", target.index())
            }

            Self::If {
                condition,
                then_target,
                else_target,
            } => {
                format!(
                    "if {} then jump bb{} else jump bb{}",
                    condition.pretty_print(0),
                    then_target.index(),
                    else_target.index()
                )
            }

            Self::Return { values } if values.is_empty() => "return".to_string(),

            Self::Return { values } => {
                let values_str = values
                    .iter()
                    .map(|v| v.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("return {values_str}")
            }

            Self::Unreachable => "unreachable".to_string(),
        }
    }
}
