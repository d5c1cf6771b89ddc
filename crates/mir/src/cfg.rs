//! # Control Flow Graph Utilities
//!
//! This module provides common utilities for working with control flow graphs.
//! Predecessors are not stored on blocks; they are derived from terminators on
//! demand, so they can never go stale after a pass mutates the CFG.

use rustc_hash::FxHashMap;

use crate::{BasicBlockId, MirFunction};

/// Get all successor blocks of a given block
pub fn get_successors(function: &MirFunction, block_id: BasicBlockId) -> Vec<BasicBlockId> {
    function
        .basic_blocks
        .get(block_id)
        .map(|block| block.terminator.target_blocks())
        .unwrap_or_default()
}

/// Build a map from each block to its predecessors
///
/// Predecessors are deduplicated: a conditional branch with both targets
/// pointing at the same block contributes a single edge.
pub fn build_predecessor_map(
    function: &MirFunction,
) -> FxHashMap<BasicBlockId, Vec<BasicBlockId>> {
    let mut predecessors: FxHashMap<BasicBlockId, Vec<BasicBlockId>> = FxHashMap::default();

    for (block_id, _) in function.basic_blocks.iter_enumerated() {
        predecessors.insert(block_id, Vec::new());
    }

    for (pred_id, pred_block) in function.basic_blocks.iter_enumerated() {
        for succ_id in pred_block.terminator.target_blocks() {
            let preds = predecessors.entry(succ_id).or_default();
            if !preds.contains(&pred_id) {
                preds.push(pred_id);
            }
        }
    }

    predecessors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Terminator, Value};

    fn diamond() -> MirFunction {
        let mut function = MirFunction::new("diamond".to_string());
        let entry = function.entry_block;
        let left = function.add_basic_block();
        let right = function.add_basic_block();
        let merge = function.add_basic_block();

        let cond = function.new_value_id();
        function.basic_blocks[entry].push_instruction(crate::Instruction::assign(
            cond,
            Value::boolean(true),
            crate::MirType::bool(),
        ));
        function.basic_blocks[entry].terminator =
            Terminator::branch(Value::operand(cond), left, right);
        function.basic_blocks[left].terminator = Terminator::jump(merge);
        function.basic_blocks[right].terminator = Terminator::jump(merge);
        function.basic_blocks[merge].terminator = Terminator::return_void();

        function
    }

    #[test]
    fn successors_follow_terminators() {
        let function = diamond();

        let entry_succs = get_successors(&function, function.entry_block);
        assert_eq!(entry_succs.len(), 2);

        let merge_succs = get_successors(&function, BasicBlockId::new(3));
        assert!(merge_succs.is_empty());
    }

    #[test]
    fn predecessor_map_covers_all_blocks() {
        let function = diamond();
        let preds = build_predecessor_map(&function);

        assert!(preds[&function.entry_block].is_empty());
        assert_eq!(preds[&BasicBlockId::new(1)], vec![function.entry_block]);
        assert_eq!(preds[&BasicBlockId::new(3)].len(), 2);
    }

    #[test]
    fn predecessor_map_deduplicates_double_edges() {
        let mut function = MirFunction::new("double".to_string());
        let entry = function.entry_block;
        let target = function.add_basic_block();

        // Both branch targets point at the same block
        let cond = function.new_value_id();
        function.basic_blocks[entry].push_instruction(crate::Instruction::assign(
            cond,
            Value::boolean(false),
            crate::MirType::bool(),
        ));
        function.basic_blocks[entry].terminator =
            Terminator::branch(Value::operand(cond), target, target);
        function.basic_blocks[target].terminator = Terminator::return_void();

        let preds = build_predecessor_map(&function);
        assert_eq!(preds[&target], vec![entry]);
    }
}
