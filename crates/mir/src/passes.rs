//! # MIR Optimization Passes
//!
//! This module implements the optimization passes that can be applied to MIR
//! functions, plus the pass manager that sequences them.

pub mod mem2reg;
pub mod scalar_repl;

pub use mem2reg::{MemoryPromoter, PromotableSlot, PromoterStats, SsaPromoter};
pub use scalar_repl::{ScalarReplacement, ScalarReplacementConfig, ScalarReplacementStats};

use crate::{InstructionKind, MirFunction, MirModule};

/// Analyzes a MIR function to determine if it uses memory operations
/// that would give the scalar-replacement pass anything to do.
pub fn function_uses_memory(function: &MirFunction) -> bool {
    for block in function.basic_blocks.iter() {
        for instruction in &block.instructions {
            match &instruction.kind {
                InstructionKind::StackAlloc { .. }
                | InstructionKind::Load { .. }
                | InstructionKind::Store { .. }
                | InstructionKind::FieldAddr { .. } => {
                    return true;
                }
                _ => continue,
            }
        }
    }
    false
}

/// A trait for MIR optimization passes
pub trait MirPass {
    /// Apply this pass to a MIR function
    /// Returns true if the function was modified
    fn run(&mut self, function: &mut MirFunction) -> bool;

    /// Get the name of this pass for debugging
    fn name(&self) -> &'static str;
}

/// A wrapper for conditional pass execution
///
/// This allows passes to be skipped based on function characteristics,
/// so functions that allocate no memory never pay for memory optimization.
pub struct ConditionalPass {
    pass: Box<dyn MirPass>,
    condition: fn(&MirFunction) -> bool,
}

impl ConditionalPass {
    /// Create a new conditional pass
    pub fn new(pass: Box<dyn MirPass>, condition: fn(&MirFunction) -> bool) -> Self {
        Self { pass, condition }
    }
}

impl MirPass for ConditionalPass {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        if (self.condition)(function) {
            self.pass.run(function)
        } else {
            // Skip the pass - no changes needed
            false
        }
    }

    fn name(&self) -> &'static str {
        self.pass.name()
    }
}

/// Validation Pass
///
/// Checks the structural invariants of a function and logs every violation.
/// The function is never modified; validation failures are a bug in an
/// earlier pass, not something to paper over.
#[derive(Debug, Default)]
pub struct Validation;

impl Validation {
    /// Create a new validation pass
    pub const fn new() -> Self {
        Self
    }
}

impl MirPass for Validation {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        if let Err(err) = function.validate() {
            log::error!("validation of function '{}' failed: {err}", function.name);
        }
        false
    }

    fn name(&self) -> &'static str {
        "Validation"
    }
}

/// A pass manager that can run multiple passes in sequence
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn MirPass>>,
}

impl PassManager {
    /// Create a new pass manager
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the manager
    pub fn add_pass<P: MirPass + 'static>(mut self, pass: P) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Add a conditional pass to the manager
    /// The pass will only run if the condition function returns true
    pub fn add_conditional_pass<P: MirPass + 'static>(
        mut self,
        pass: P,
        condition: fn(&MirFunction) -> bool,
    ) -> Self {
        self.passes
            .push(Box::new(ConditionalPass::new(Box::new(pass), condition)));
        self
    }

    /// Run all passes on the function
    /// Returns true if any pass modified the function
    pub fn run(&mut self, function: &mut MirFunction) -> bool {
        let mut modified = false;

        for pass in &mut self.passes {
            if pass.run(function) {
                modified = true;
                log::debug!(
                    "pass '{}' modified function '{}'",
                    pass.name(),
                    function.name
                );
            }
        }

        modified
    }

    /// Run all passes on every function in the module
    /// Returns true if any function was modified
    pub fn run_module(&mut self, module: &mut MirModule) -> bool {
        let mut modified = false;
        for function in module.functions_mut() {
            modified |= self.run(function);
        }
        modified
    }

    /// Create the standard optimization pipeline (default)
    ///
    /// Scalar replacement only runs for functions that touch memory; the
    /// final validation catches structural damage from any pass.
    pub fn standard_pipeline() -> Self {
        Self::new()
            .add_conditional_pass(ScalarReplacement::new(), function_uses_memory)
            .add_pass(Validation::new())
    }
}

#[cfg(test)]
#[path = "passes_tests.rs"]
mod tests;
