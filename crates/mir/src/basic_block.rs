//! # MIR Basic Block
//!
//! This module defines basic blocks, the fundamental building blocks of the CFG.
//! A basic block is a straight-line sequence of instructions with exactly one entry
//! point and one exit point.

use crate::{indent_str, Instruction, InstructionKind, PrettyPrint, Terminator};

/// A basic block in the Control Flow Graph
///
/// A basic block represents a straight-line sequence of instructions that:
/// - Has exactly one entry point (the first instruction)
/// - Has exactly one exit point (the terminator)
/// - Contains no jumps or branches except at the end
///
/// # Invariants
///
/// - Every basic block must have exactly one terminator
/// - Phi instructions may only appear in the leading run of the block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// The sequence of instructions in this block
    /// These execute sequentially without any control flow changes
    pub instructions: Vec<Instruction>,

    /// The terminator that ends this block and transfers control
    pub terminator: Terminator,
}

impl BasicBlock {
    /// Creates a new empty basic block with an unreachable terminator
    ///
    /// The unreachable terminator serves as a placeholder until the real
    /// terminator is set during construction.
    pub const fn new() -> Self {
        Self {
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }

    /// Adds an instruction to the end of this block
    pub fn push_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Inserts a phi instruction at the front of the block
    ///
    /// Phis must stay in the leading run, so new ones always go first.
    pub fn push_phi_front(&mut self, instruction: Instruction) {
        debug_assert!(instruction.is_phi());
        self.instructions.insert(0, instruction);
    }

    /// Returns the number of leading phi instructions
    pub fn phi_count(&self) -> usize {
        self.instructions.iter().take_while(|i| i.is_phi()).count()
    }

    /// Sets the terminator for this block
    pub fn set_terminator(&mut self, terminator: Terminator) {
        self.terminator = terminator;
    }

    /// Returns a mutable iterator over the instructions in this block
    pub fn instructions_mut(&mut self) -> impl Iterator<Item = &mut Instruction> {
        self.instructions.iter_mut()
    }

    /// Validates the basic block structure
    pub fn validate(&self) -> Result<(), String> {
        for (i, instruction) in self.instructions.iter().enumerate() {
            if let Err(err) = instruction.validate() {
                return Err(format!("instruction {i} validation failed: {err}"));
            }
        }

        // Phis only in the leading run
        let mut seen_non_phi = false;
        for (i, instruction) in self.instructions.iter().enumerate() {
            match &instruction.kind {
                InstructionKind::Phi { .. } => {
                    if seen_non_phi {
                        return Err(format!(
                            "phi at position {i} appears after a non-phi instruction"
                        ));
                    }
                }
                _ => seen_non_phi = true,
            }
        }

        Ok(())
    }

    /// Returns all values used by this basic block
    ///
    /// This includes values used in instructions and the terminator.
    pub fn used_values(&self) -> std::collections::HashSet<crate::ValueId> {
        let mut used = std::collections::HashSet::new();

        for instruction in &self.instructions {
            used.extend(instruction.used_values());
        }
        used.extend(self.terminator.used_values());

        used
    }
}

impl Default for BasicBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl PrettyPrint for BasicBlock {
    fn pretty_print(&self, indent: usize) -> String {
        let mut result = String::new();
        let base_indent = indent_str(indent);

        for instruction in &self.instructions {
            result.push_str(&format!("{}{}\n", base_indent, instruction.pretty_print(0)));
        }

        result.push_str(&format!(
            "{}{}\n",
            base_indent,
            self.terminator.pretty_print(0)
        ));

        result
    }
}
