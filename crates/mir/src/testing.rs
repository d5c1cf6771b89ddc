//! # Testing Utilities for MIR
//!
//! This module provides a small builder for hand-constructing the memory-heavy
//! fixtures the pass tests need. Element types for loads and stores are
//! derived from the address value's pointer type, so tests only spell types
//! once, at the allocation.

use crate::instruction::CalleeSignature;
use crate::{
    BasicBlockId, BinaryOp, FunctionId, Instruction, MirFunction, MirType, Terminator, Value,
    ValueId,
};

/// Builder for creating test MIR functions
pub struct FunctionBuilder {
    function: MirFunction,
    current_block: BasicBlockId,
}

impl FunctionBuilder {
    /// Creates a builder positioned at the entry block
    pub fn new(name: &str) -> Self {
        let function = MirFunction::new(name.to_string());
        let current_block = function.entry_block;
        Self {
            function,
            current_block,
        }
    }

    /// Adds a new basic block without switching to it
    pub fn add_block(&mut self) -> BasicBlockId {
        self.function.add_basic_block()
    }

    /// Makes `block` the target of subsequent instructions
    pub fn switch_to(&mut self, block: BasicBlockId) -> &mut Self {
        self.current_block = block;
        self
    }

    /// Returns the block currently being built
    pub const fn current_block(&self) -> BasicBlockId {
        self.current_block
    }

    /// Allocates a stack slot of `ty`, returning its address value
    pub fn stack_alloc(&mut self, ty: MirType) -> ValueId {
        let dest = self
            .function
            .new_typed_value_id(MirType::pointer(ty.clone()));
        self.push(Instruction::stack_alloc(dest, ty));
        dest
    }

    /// Allocates a named stack slot of `ty`
    pub fn named_stack_alloc(&mut self, name: &str, ty: MirType) -> ValueId {
        let dest = self.stack_alloc(ty);
        self.function.set_value_name(dest, name.to_string());
        dest
    }

    /// Allocates a volatile stack slot of `ty`
    pub fn volatile_stack_alloc(&mut self, ty: MirType) -> ValueId {
        let dest = self
            .function
            .new_typed_value_id(MirType::pointer(ty.clone()));
        self.push(Instruction::volatile_stack_alloc(dest, ty));
        dest
    }

    /// Loads through `address`; the element type comes from the address type
    pub fn load(&mut self, address: ValueId) -> ValueId {
        let ty = self.element_type(address);
        let dest = self.function.new_typed_value_id(ty.clone());
        self.push(Instruction::load(dest, ty, Value::operand(address)));
        dest
    }

    /// Volatile load through `address`
    pub fn volatile_load(&mut self, address: ValueId) -> ValueId {
        let ty = self.element_type(address);
        let dest = self.function.new_typed_value_id(ty.clone());
        self.push(Instruction::volatile_load(dest, ty, Value::operand(address)));
        dest
    }

    /// Stores `value` through `address`
    pub fn store(&mut self, address: ValueId, value: Value) {
        let ty = self.element_type(address);
        self.push(Instruction::store(Value::operand(address), value, ty));
    }

    /// Volatile store of `value` through `address`
    pub fn volatile_store(&mut self, address: ValueId, value: Value) {
        let ty = self.element_type(address);
        self.push(Instruction::volatile_store(
            Value::operand(address),
            value,
            ty,
        ));
    }

    /// Projects field `index` of the aggregate slot at `base`
    pub fn field_addr(&mut self, base: ValueId, index: Value) -> ValueId {
        let ty = index
            .as_const_index()
            .and_then(|i| {
                self.function
                    .get_value_type(base)
                    .and_then(MirType::pointer_element_type)
                    .and_then(|element| element.field_type(i))
                    .cloned()
            })
            .unwrap_or(MirType::Unknown);
        let dest = self.function.new_typed_value_id(MirType::pointer(ty));
        self.push(Instruction::field_addr(dest, Value::operand(base), index));
        dest
    }

    /// Adds a binary operation
    pub fn binary_op(&mut self, op: BinaryOp, left: Value, right: Value) -> ValueId {
        let ty = if op.is_equality() {
            MirType::bool()
        } else {
            MirType::int()
        };
        let dest = self.function.new_typed_value_id(ty);
        self.push(Instruction::binary_op(op, dest, left, right));
        dest
    }

    /// Adds an assignment of `source` with type `ty`
    pub fn assign(&mut self, source: Value, ty: MirType) -> ValueId {
        let dest = self.function.new_typed_value_id(ty.clone());
        self.push(Instruction::assign(dest, source, ty));
        dest
    }

    /// Passes `args` to an external function returning nothing
    ///
    /// The callee id is synthetic; these fixtures never resolve calls.
    pub fn escape_call(&mut self, args: Vec<Value>) {
        let signature = CalleeSignature {
            param_types: args.iter().map(|_| MirType::unknown()).collect(),
            return_types: vec![],
        };
        self.push(Instruction::void_call(FunctionId::new(0), args, signature));
    }

    /// Sets the terminator of the current block
    pub fn terminate(&mut self, terminator: Terminator) -> &mut Self {
        self.function.basic_blocks[self.current_block].set_terminator(terminator);
        self
    }

    /// Jump to `target` and switch to it
    pub fn jump_to(&mut self, target: BasicBlockId) -> &mut Self {
        self.terminate(Terminator::jump(target));
        self.switch_to(target)
    }

    /// Conditional branch out of the current block
    pub fn branch(
        &mut self,
        condition: Value,
        then_target: BasicBlockId,
        else_target: BasicBlockId,
    ) -> &mut Self {
        self.terminate(Terminator::branch(condition, then_target, else_target))
    }

    /// Return a single value
    pub fn return_value(&mut self, value: Value) -> &mut Self {
        self.terminate(Terminator::return_value(value))
    }

    /// Return without a value
    pub fn return_void(&mut self) -> &mut Self {
        self.terminate(Terminator::return_void())
    }

    /// Finishes building and returns the function
    pub fn build(self) -> MirFunction {
        self.function
    }

    fn element_type(&self, address: ValueId) -> MirType {
        self.function
            .get_value_type(address)
            .and_then(MirType::pointer_element_type)
            .cloned()
            .unwrap_or(MirType::Unknown)
    }

    fn push(&mut self, instruction: Instruction) {
        self.function.basic_blocks[self.current_block].push_instruction(instruction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_derives_element_types() {
        let mut b = FunctionBuilder::new("derive");
        let slot = b.stack_alloc(MirType::int());
        b.store(slot, Value::integer(1));
        let loaded = b.load(slot);
        b.return_value(Value::operand(loaded));
        let function = b.build();

        assert_eq!(function.get_value_type(loaded), Some(&MirType::Int));
        assert_eq!(
            function.get_value_type(slot),
            Some(&MirType::pointer(MirType::int()))
        );
        assert!(function.validate().is_ok());
    }

    #[test]
    fn builder_types_field_projections() {
        let aggregate = MirType::aggregate(vec![MirType::int(), MirType::bool()]);
        let mut b = FunctionBuilder::new("fields");
        let slot = b.stack_alloc(aggregate);
        let field1 = b.field_addr(slot, Value::integer(1));
        b.store(field1, Value::boolean(true));
        b.return_void();
        let function = b.build();

        assert_eq!(
            function.get_value_type(field1),
            Some(&MirType::pointer(MirType::bool()))
        );
        assert!(function.validate().is_ok());
    }
}
