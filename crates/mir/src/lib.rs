//! # Basalt Mid-level Intermediate Representation (MIR)
//!
//! This crate defines the data structures for the mid-level intermediate
//! representation of the Basalt compiler together with the local-memory
//! optimization passes that run on it. The MIR is a platform-independent
//! representation used between lowering and code generation.
//!
//! ## Design Principles
//!
//! The design is inspired by LLVM IR and is based on:
//!
//! 1. **Control Flow Graph (CFG)**: Functions are represented as directed graphs of basic blocks
//! 2. **Three-Address Code (TAC)**: Instructions are simple, atomic operations
//! 3. **Static Single Assignment (SSA)**: Each virtual register is assigned exactly once
//! 4. **Explicit Control Flow**: All control flow is explicit through terminators
//!
//! ## Architecture
//!
//! ```text
//! MirModule
//! functions: IndexVec<FunctionId, MirFunction>
//! ...
//!
//! MirFunction
//! basic_blocks: IndexVec<BasicBlockId, BasicBlock>
//! value_types: Map<ValueId, MirType>
//! entry_block: BasicBlockId
//!
//! BasicBlock
//! instructions: Vec<Instruction>
//! terminator: Terminator
//! ```
//!
//! ## Memory Model
//!
//! Local variables start life as stack slots (`StackAlloc`) accessed through
//! loads, stores and field projections (`FieldAddr`). The scalar-replacement
//! pass splits aggregate slots field by field and promotes scalar slots into
//! SSA values, so most slots never survive to code generation.
//!
//! ## Error Handling
//!
//! Structural problems are reported by `validate()`; the passes treat
//! ineligible allocations as ordinary skips and reserve panics for broken
//! internal invariants.

#![allow(clippy::option_if_let_else)]

pub use basic_block::BasicBlock;
pub use function::MirFunction;
pub use instruction::{BinaryOp, CalleeSignature, Instruction, InstructionKind};
pub use mir_types::MirType;
pub use module::MirModule;
pub use passes::{MirPass, PassManager, ScalarReplacement, Validation};
pub use terminator::Terminator;
pub use value::{Literal, Value};

pub mod analysis;
pub mod basic_block;
pub mod cfg;
pub mod function;
pub mod instruction;
pub mod mir_types;
pub mod module;
pub mod passes;
pub mod terminator;
pub mod value;

#[cfg(test)]
pub mod testing;



// --- Core Identifiers ---

index_vec::define_index_type! {
    /// Unique identifier for a function within a MIR module
    pub struct FunctionId = usize;
}

index_vec::define_index_type! {
    /// Unique identifier for a basic block within a function
    pub struct BasicBlockId = usize;
}

index_vec::define_index_type! {
    /// Unique identifier for a value (virtual register) within a function
    pub struct ValueId = usize;
}

// --- Pretty Printing Support ---

/// Trait for pretty-printing MIR constructs
pub trait PrettyPrint {
    fn pretty_print(&self, indent: usize) -> String;
}

/// Helper function to create indentation
pub(crate) fn indent_str(level: usize) -> String {
    "  ".repeat(level)
}
