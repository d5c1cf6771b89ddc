//! # MIR Function
//!
//! This module defines the function-level MIR representation, including
//! the Control Flow Graph (CFG) of basic blocks.

use index_vec::IndexVec;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    cfg, indent_str, BasicBlock, BasicBlockId, InstructionKind, MirType, PrettyPrint, Value,
    ValueId,
};

/// The MIR for a single function, laid out as a Control Flow Graph (CFG)
///
/// A `MirFunction` represents the complete control flow and data flow
/// for a single function, using a graph of basic blocks.
///
/// # Design Notes
///
/// - Basic blocks are stored in an `IndexVec` for efficient access
/// - Each function has exactly one entry block
/// - Types and names live in side tables keyed by `ValueId`, so passes can
///   repoint uses with a plain id swap instead of pointer surgery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirFunction {
    /// The name of the function (for debugging and linking)
    pub name: String,

    /// All basic blocks in this function, forming the CFG
    pub basic_blocks: IndexVec<BasicBlockId, BasicBlock>,

    /// The entry point of the function (always valid if function has blocks)
    pub entry_block: BasicBlockId,

    /// Function parameters mapped to their MIR values
    /// The order matches the function signature
    pub parameters: Vec<ValueId>,

    /// Type information for each value in the function
    pub value_types: FxHashMap<ValueId, MirType>,

    /// Optional names for values, used for stack slots
    ///
    /// When an aggregate slot is split, the per-field replacement slots get
    /// deterministic names derived from the original slot's entry here.
    pub value_names: FxHashMap<ValueId, String>,

    /// Next available value ID for generating new temporaries
    pub(crate) next_value_id: u32,
}

impl MirFunction {
    /// Creates a new empty function with the given name
    ///
    /// The function starts with a single empty entry block.
    pub fn new(name: String) -> Self {
        let mut basic_blocks = IndexVec::new();
        let entry_block = basic_blocks.push(BasicBlock::new());

        Self {
            name,
            basic_blocks,
            entry_block,
            parameters: Vec::new(),
            value_types: FxHashMap::default(),
            value_names: FxHashMap::default(),
            next_value_id: 0,
        }
    }

    /// Adds a new basic block and returns its ID
    pub fn add_basic_block(&mut self) -> BasicBlockId {
        self.basic_blocks.push(BasicBlock::new())
    }

    /// Generates a new unique value ID within this function
    pub fn new_value_id(&mut self) -> ValueId {
        let id = ValueId::new(self.next_value_id as usize);
        self.next_value_id += 1;
        id
    }

    /// Generates a new unique value ID with type information
    pub fn new_typed_value_id(&mut self, mir_type: MirType) -> ValueId {
        let id = self.new_value_id();
        self.value_types.insert(id, mir_type);
        id
    }

    /// Gets the type for a value ID
    pub fn get_value_type(&self, value_id: ValueId) -> Option<&MirType> {
        self.value_types.get(&value_id)
    }

    /// Sets the name for a value ID
    pub fn set_value_name(&mut self, value_id: ValueId, name: String) {
        self.value_names.insert(value_id, name);
    }

    /// Gets the name for a value ID
    pub fn get_value_name(&self, value_id: ValueId) -> Option<&str> {
        self.value_names.get(&value_id).map(String::as_str)
    }

    /// Returns an iterator over all basic blocks
    pub fn basic_blocks(&self) -> impl Iterator<Item = (BasicBlockId, &BasicBlock)> {
        self.basic_blocks.iter_enumerated()
    }

    /// Returns a map from each ValueId to its usage count in the function
    ///
    /// Useful for optimization passes like dead code elimination.
    pub fn get_value_use_counts(&self) -> FxHashMap<ValueId, usize> {
        let mut counts = FxHashMap::default();
        for (_id, block) in self.basic_blocks() {
            for instruction in &block.instructions {
                for used_value in instruction.used_values() {
                    *counts.entry(used_value).or_default() += 1;
                }
            }
            for used_value in block.terminator.used_values() {
                *counts.entry(used_value).or_default() += 1;
            }
        }
        counts
    }

    /// Replaces every use of `from` with `to` throughout the function
    ///
    /// This is the O(uses) id-swap the rewrite passes rely on: the value can
    /// be repointed at another operand or substituted by a literal without
    /// touching definitions. Returns the number of uses replaced.
    pub fn replace_all_uses(&mut self, from: ValueId, to: Value) -> usize {
        if to == Value::Operand(from) {
            return 0;
        }

        let mut replaced = 0;
        for block in &mut self.basic_blocks {
            for instruction in &mut block.instructions {
                replaced += instruction.replace_value_uses(from, to);
            }
            replaced += block.terminator.replace_value_uses(from, to);
        }

        replaced
    }

    /// Validates the function structure
    ///
    /// Checks:
    /// - Entry block exists
    /// - Terminator targets are in range
    /// - Each value is defined at most once
    /// - Every used operand is defined somewhere (parameter or instruction)
    /// - Phis only appear in a block's leading run
    /// - Phi sources name actual predecessors, without duplicates
    /// - Call arity matches the recorded callee signature
    /// - Constant field-projection indexes are in range for known aggregates
    pub fn validate(&self) -> Result<(), String> {
        if self.basic_blocks.get(self.entry_block).is_none() {
            return Err(format!("entry block {:?} does not exist", self.entry_block));
        }

        let predecessors = cfg::build_predecessor_map(self);

        // Single definition per value, collected for the use check below
        let mut defined: FxHashSet<ValueId> = self.parameters.iter().copied().collect();
        for (block_id, block) in self.basic_blocks() {
            for instruction in &block.instructions {
                for dest in instruction.destinations() {
                    if !defined.insert(dest) {
                        return Err(format!(
                            "value {dest:?} is defined more than once (block {block_id:?})"
                        ));
                    }
                }
            }
        }

        for (block_id, block) in self.basic_blocks() {
            if let Err(err) = block.validate() {
                return Err(format!("block {block_id:?} validation failed: {err}"));
            }

            for target in block.terminator.target_blocks() {
                if self.basic_blocks.get(target).is_none() {
                    return Err(format!(
                        "block {block_id:?} targets non-existent block {target:?}"
                    ));
                }
            }

            for used_value in block.used_values() {
                if !defined.contains(&used_value) {
                    return Err(format!(
                        "block {block_id:?} uses value {used_value:?} that is never defined"
                    ));
                }
            }

            let preds = predecessors.get(&block_id);
            for instruction in &block.instructions {
                match &instruction.kind {
                    InstructionKind::Phi { dest, sources, .. } => {
                        let mut seen = FxHashSet::default();
                        for (source_block, _value) in sources {
                            if !preds.is_some_and(|p| p.contains(source_block)) {
                                return Err(format!(
                                    "block {block_id:?}: phi {dest:?} has a source from \
                                     {source_block:?}, which is not a predecessor"
                                ));
                            }
                            if !seen.insert(*source_block) {
                                return Err(format!(
                                    "block {block_id:?}: phi {dest:?} has duplicate source \
                                     block {source_block:?}"
                                ));
                            }
                        }
                    }

                    InstructionKind::FieldAddr { base, index, .. } => {
                        // Out-of-range constant projections are caught here;
                        // non-constant ones are legal IR, just never expandable
                        if let (Value::Operand(base_id), Some(field_index)) =
                            (base, index.as_const_index())
                        {
                            if let Some(MirType::Pointer { element }) = self.get_value_type(*base_id)
                            {
                                if element.is_aggregate()
                                    && element.field_type(field_index).is_none()
                                {
                                    return Err(format!(
                                        "block {block_id:?}: field projection index {field_index} \
                                         out of range for aggregate {element}"
                                    ));
                                }
                            }
                        }
                    }

                    _ => {}
                }
            }
        }

        Ok(())
    }
}

impl PrettyPrint for MirFunction {
    fn pretty_print(&self, indent: usize) -> String {
        let mut result = String::new();
        let base_indent = indent_str(indent);

        result.push_str(&format!("{}fn {} {{\n", base_indent, self.name));

        if !self.parameters.is_empty() {
            let params = self
                .parameters
                .iter()
                .map(|p| p.pretty_print(0))
                .collect::<Vec<_>>()
                .join(", ");
            result.push_str(&format!("{base_indent}  parameters: {params}\n"));
        }

        result.push_str(&format!(
            "{}  entry: bb{}\n",
            base_indent,
            self.entry_block.index()
        ));
        result.push('\n');

        for (block_id, block) in self.basic_blocks() {
            result.push_str(&format!("{}  bb{}:\n", base_indent, block_id.index()));
            result.push_str(&block.pretty_print(indent + 2));
            result.push('\n');
        }

        result.push_str(&format!("{base_indent}}}\n"));
        result
    }
}
