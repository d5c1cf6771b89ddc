//! # MIR Instructions
//!
//! This module defines the instruction types for MIR.
//! Instructions perform computations but do not transfer control flow.

use std::collections::HashSet;

use crate::{MirType, PrettyPrint, Value, ValueId};

/// Signature of a call target, recorded at every call site
///
/// Carrying the signature on the instruction lets the validator check call
/// arity without resolving the callee through the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalleeSignature {
    pub param_types: Vec<MirType>,
    pub return_types: Vec<MirType>,
}

/// Binary operators available in MIR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    Neq,
}

impl BinaryOp {
    /// Returns true for the equality predicates
    pub const fn is_equality(&self) -> bool {
        matches!(self, Self::Eq | Self::Neq)
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Eq => "eq",
            Self::Neq => "neq",
        };
        write!(f, "{name}")
    }
}

/// An instruction performs an operation but does NOT transfer control
///
/// Instructions always fall through to the next instruction in the block.
/// Control flow changes are handled exclusively by terminators.
///
/// # Design Notes
///
/// - All instructions follow three-address code (TAC) format
/// - Each instruction has at most one operation
/// - Memory instructions carry the accessed element type and a volatility flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The kind of instruction and its operands
    pub kind: InstructionKind,
}

/// The different kinds of instructions available in MIR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// Simple assignment: `dest = source`
    /// Used for variable assignments and copies
    Assign {
        dest: ValueId,
        source: Value,
        ty: MirType,
    },

    /// Binary operation: `dest = op left, right`
    /// Covers arithmetic and the equality predicates
    BinaryOp {
        op: BinaryOp,
        dest: ValueId,
        left: Value,
        right: Value,
    },

    /// Function call: `dests = call callee(args)`
    /// For calling functions that return one or more values
    Call {
        dests: Vec<ValueId>,
        callee: crate::FunctionId,
        args: Vec<Value>,
        signature: CalleeSignature,
    },

    /// Void function call: `call callee(args)`
    /// For calling functions that don't return a value
    VoidCall {
        callee: crate::FunctionId,
        args: Vec<Value>,
        signature: CalleeSignature,
    },

    /// Load from memory: `dest = load ty, addr`
    Load {
        dest: ValueId,
        ty: MirType,
        address: Value,
        volatile: bool,
    },

    /// Store to memory: `store addr, value`
    /// Always writes the whole slot the address points at
    Store {
        address: Value,
        value: Value,
        ty: MirType,
        volatile: bool,
    },

    /// Allocate a typed slot on the stack: `dest = stackalloc ty`
    ///
    /// `dest` is the address of the slot, typed as a pointer to `ty`.
    /// Volatile slots keep every access observable and are never promoted.
    StackAlloc {
        dest: ValueId,
        ty: MirType,
        volatile: bool,
    },

    /// Field projection: `dest = fieldaddr base, index`
    ///
    /// Computes the address of one positional field of an aggregate slot.
    /// A splittable projection carries a constant index; a non-constant
    /// index makes the owning allocation non-expandable.
    FieldAddr {
        dest: ValueId,
        base: Value,
        index: Value,
    },

    /// SSA phi node: `dest = phi [pred: value], ...`
    /// Merges one value per predecessor edge at a control-flow join
    Phi {
        dest: ValueId,
        ty: MirType,
        sources: Vec<(crate::BasicBlockId, Value)>,
    },
}

impl Instruction {
    /// Creates a new assignment instruction
    pub const fn assign(dest: ValueId, source: Value, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::Assign { dest, source, ty },        }
    }

    /// Creates a new binary operation instruction
    pub const fn binary_op(op: BinaryOp, dest: ValueId, left: Value, right: Value) -> Self {
        Self {
            kind: InstructionKind::BinaryOp {
                op,
                dest,
                left,
                right,
            },        }
    }

    /// Creates a new call instruction with return values
    pub const fn call(
        dests: Vec<ValueId>,
        callee: crate::FunctionId,
        args: Vec<Value>,
        signature: CalleeSignature,
    ) -> Self {
        Self {
            kind: InstructionKind::Call {
                dests,
                callee,
                args,
                signature,
            },        }
    }

    /// Creates a new void call instruction
    pub const fn void_call(
        callee: crate::FunctionId,
        args: Vec<Value>,
        signature: CalleeSignature,
    ) -> Self {
        Self {
            kind: InstructionKind::VoidCall {
                callee,
                args,
                signature,
            },        }
    }

    /// Creates a new load instruction
    pub const fn load(dest: ValueId, ty: MirType, address: Value) -> Self {
        Self {
            kind: InstructionKind::Load {
                dest,
                ty,
                address,
                volatile: false,
            },        }
    }

    /// Creates a new volatile load instruction
    pub const fn volatile_load(dest: ValueId, ty: MirType, address: Value) -> Self {
        Self {
            kind: InstructionKind::Load {
                dest,
                ty,
                address,
                volatile: true,
            },        }
    }

    /// Creates a new store instruction
    pub const fn store(address: Value, value: Value, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::Store {
                address,
                value,
                ty,
                volatile: false,
            },        }
    }

    /// Creates a new volatile store instruction
    pub const fn volatile_store(address: Value, value: Value, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::Store {
                address,
                value,
                ty,
                volatile: true,
            },        }
    }

    /// Creates a new stack allocation instruction
    pub const fn stack_alloc(dest: ValueId, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::StackAlloc {
                dest,
                ty,
                volatile: false,
            },        }
    }

    /// Creates a new volatile stack allocation instruction
    pub const fn volatile_stack_alloc(dest: ValueId, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::StackAlloc {
                dest,
                ty,
                volatile: true,
            },        }
    }

    /// Creates a new field projection instruction
    pub const fn field_addr(dest: ValueId, base: Value, index: Value) -> Self {
        Self {
            kind: InstructionKind::FieldAddr { dest, base, index },        }
    }

    /// Creates a new phi instruction
    pub const fn phi(
        dest: ValueId,
        ty: MirType,
        sources: Vec<(crate::BasicBlockId, Value)>,
    ) -> Self {
        Self {
            kind: InstructionKind::Phi { dest, ty, sources },        }
    }

    /// Creates a phi instruction with no sources yet
    /// Sources are filled in during SSA renaming
    pub const fn empty_phi(dest: ValueId, ty: MirType) -> Self {
        Self {
            kind: InstructionKind::Phi {
                dest,
                ty,
                sources: Vec::new(),
            },        }
    }

    /// Returns true if this is a phi instruction
    pub const fn is_phi(&self) -> bool {
        matches!(self.kind, InstructionKind::Phi { .. })
    }

    /// Returns the destination values if this instruction defines any
    pub fn destinations(&self) -> Vec<ValueId> {
        match &self.kind {
            InstructionKind::Assign { dest, .. }
            | InstructionKind::BinaryOp { dest, .. }
            | InstructionKind::Load { dest, .. }
            | InstructionKind::StackAlloc { dest, .. }
            | InstructionKind::FieldAddr { dest, .. }
            | InstructionKind::Phi { dest, .. } => vec![*dest],

            InstructionKind::Call { dests, .. } => dests.clone(),

            InstructionKind::VoidCall { .. } | InstructionKind::Store { .. } => vec![],
        }
    }

    /// Returns all values used by this instruction
    pub fn used_values(&self) -> HashSet<ValueId> {
        let mut used = HashSet::new();

        match &self.kind {
            InstructionKind::Assign { source, .. } => {
                if let Value::Operand(id) = source {
                    used.insert(*id);
                }
            }

            InstructionKind::BinaryOp { left, right, .. } => {
                if let Value::Operand(id) = left {
                    used.insert(*id);
                }
                if let Value::Operand(id) = right {
                    used.insert(*id);
                }
            }

            InstructionKind::Call { args, .. } | InstructionKind::VoidCall { args, .. } => {
                for arg in args {
                    if let Value::Operand(id) = arg {
                        used.insert(*id);
                    }
                }
            }

            InstructionKind::Load { address, .. } => {
                if let Value::Operand(id) = address {
                    used.insert(*id);
                }
            }

            InstructionKind::Store { address, value, .. } => {
                if let Value::Operand(id) = address {
                    used.insert(*id);
                }
                if let Value::Operand(id) = value {
                    used.insert(*id);
                }
            }

            InstructionKind::StackAlloc { .. } => {
                // Stack allocation doesn't use any values as input
            }

            InstructionKind::FieldAddr { base, index, .. } => {
                if let Value::Operand(id) = base {
                    used.insert(*id);
                }
                if let Value::Operand(id) = index {
                    used.insert(*id);
                }
            }

            InstructionKind::Phi { sources, .. } => {
                for (_, value) in sources {
                    if let Value::Operand(id) = value {
                        used.insert(*id);
                    }
                }
            }
        }

        used
    }

    /// Replaces every use of `from` with `to`, returning the replacement count
    ///
    /// Destinations are definitions, not uses, and are left untouched.
    pub fn replace_value_uses(&mut self, from: ValueId, to: Value) -> usize {
        let mut replaced = 0;
        let mut patch = |value: &mut Value| {
            if *value == Value::Operand(from) {
                *value = to;
                replaced += 1;
            }
        };

        match &mut self.kind {
            InstructionKind::Assign { source, .. } => patch(source),

            InstructionKind::BinaryOp { left, right, .. } => {
                patch(left);
                patch(right);
            }

            InstructionKind::Call { args, .. } | InstructionKind::VoidCall { args, .. } => {
                for arg in args {
                    patch(arg);
                }
            }

            InstructionKind::Load { address, .. } => patch(address),

            InstructionKind::Store { address, value, .. } => {
                patch(address);
                patch(value);
            }

            InstructionKind::StackAlloc { .. } => {}

            InstructionKind::FieldAddr { base, index, .. } => {
                patch(base);
                patch(index);
            }

            InstructionKind::Phi { sources, .. } => {
                for (_, value) in sources {
                    patch(value);
                }
            }
        }

        replaced
    }

    /// Validates this instruction
    pub fn validate(&self) -> Result<(), String> {
        match &self.kind {
            InstructionKind::Call {
                args, signature, ..
            }
            | InstructionKind::VoidCall {
                args, signature, ..
            } => {
                if args.len() != signature.param_types.len() {
                    return Err(format!(
                        "call passes {} arguments but the callee signature expects {}",
                        args.len(),
                        signature.param_types.len()
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns true if this instruction has observable side effects
    ///
    /// Volatile loads count: eliminating one changes observable behavior.
    pub const fn has_side_effects(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::Call { .. }
                | InstructionKind::VoidCall { .. }
                | InstructionKind::Store { .. }
                | InstructionKind::StackAlloc { .. }
                | InstructionKind::Load { volatile: true, .. }
        )
    }

    /// Returns true if this instruction is pure (no side effects, result only depends on inputs)
    pub const fn is_pure(&self) -> bool {
        !self.has_side_effects()
    }
}

impl PrettyPrint for Instruction {
    fn pretty_print(&self, _indent: usize) -> String {
        let mut result = String::new();

        match &self.kind {
            InstructionKind::Assign { dest, source, .. } => {
                result.push_str(&format!(
                    "{} = {}",
                    dest.pretty_print(0),
                    source.pretty_print(0)
                ));
            }

            InstructionKind::BinaryOp {
                op,
                dest,
                left,
                right,
            } => {
                result.push_str(&format!(
                    "{} = {} {}, {}",
                    dest.pretty_print(0),
                    op,
                    left.pretty_print(0),
                    right.pretty_print(0)
                ));
            }

            InstructionKind::Call {
                dests,
                callee,
                args,
                ..
            } => {
                let args_str = args
                    .iter()
                    .map(|arg| arg.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");

                if dests.is_empty() {
                    result.push_str(&format!("call @{}({})", callee.index(), args_str));
                } else {
                    let dests_str = dests
                        .iter()
                        .map(|d| d.pretty_print(0))
                        .collect::<Vec<_>>()
                        .join(", ");
                    result.push_str(&format!(
                        "{} = call @{}({})",
                        dests_str,
                        callee.index(),
                        args_str
                    ));
                }
            }

            InstructionKind::VoidCall { callee, args, .. } => {
                let args_str = args
                    .iter()
                    .map(|arg| arg.pretty_print(0))
                    .collect::<Vec<_>>()
                    .join(", ");
                result.push_str(&format!("call @{}({})", callee.index(), args_str));
            }

            InstructionKind::Load {
                dest,
                ty,
                address,
                volatile,
            } => {
                let qualifier = if *volatile { "volatile " } else { "" };
                result.push_str(&format!(
                    "{} = load {}{}, {}",
                    dest.pretty_print(0),
                    qualifier,
                    ty,
                    address.pretty_print(0)
                ));
            }

            InstructionKind::Store {
                address,
                value,
                volatile,
                ..
            } => {
                let qualifier = if *volatile { "volatile " } else { "" };
                result.push_str(&format!(
                    "store {}{}, {}",
                    qualifier,
                    address.pretty_print(0),
                    value.pretty_print(0)
                ));
            }

            InstructionKind::StackAlloc { dest, ty, volatile } => {
                let qualifier = if *volatile { "volatile " } else { "" };
                result.push_str(&format!(
                    "{} = stackalloc {}{}",
                    dest.pretty_print(0),
                    qualifier,
                    ty
                ));
            }

            InstructionKind::FieldAddr { dest, base, index } => {
                result.push_str(&format!(
                    "{} = fieldaddr {}, {}",
                    dest.pretty_print(0),
                    base.pretty_print(0),
                    index.pretty_print(0)
                ));
            }

            InstructionKind::Phi { dest, sources, .. } => {
                if sources.is_empty() {
                    result.push_str(&format!("{} = phi", dest.pretty_print(0)));
                } else {
                    let sources_str = sources
                        .iter()
                        .map(|(block, value)| {
                            format!("[bb{}: {}]", block.index(), value.pretty_print(0))
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    result.push_str(&format!("{} = phi {}", dest.pretty_print(0), sources_str));
                }
            }
        }

        result
    }
}

impl PrettyPrint for ValueId {
    fn pretty_print(&self, _indent: usize) -> String {
        format!("%{}", self.index())
    }
}
