//! # Memory to Register Promotion
//!
//! This module defines the promotion interface consumed by the
//! scalar-replacement driver, together with the default implementation:
//! classic SSA construction for stack slots.
//!
//! The driver hands the promoter a pre-filtered set of slots (scalar type,
//! non-volatile, used only by simple loads and stores) plus fresh dominance
//! information. The promoter then:
//! 1. Inserts phi nodes at the iterated dominance frontier of each slot's
//!    store blocks
//! 2. Renames values along a dominator-tree walk with per-slot value stacks
//! 3. Deletes the slots and all their loads and stores

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    analysis::Dominance, BasicBlockId, Instruction, InstructionKind, MirFunction, MirType, Value,
    ValueId,
};

/// A stack slot the legality analyzer has cleared for promotion
#[derive(Debug, Clone)]
pub struct PromotableSlot {
    /// The address value defined by the slot's allocation instruction
    pub id: ValueId,
    /// The allocated (element) type of the slot
    pub ty: MirType,
}

/// The promotion strategy the scalar-replacement driver calls into
///
/// Implementations must uphold one contract: every input slot vanishes from
/// the function, along with all of its loads and stores, and the CFG shape is
/// left unchanged. The input set is pre-filtered, so promotion never fails.
///
/// The indirection exists so tests can substitute a double for the real SSA
/// construction.
pub trait MemoryPromoter {
    /// Promotes every slot in `slots`, mutating `function` in place
    fn promote(&mut self, function: &mut MirFunction, slots: &[PromotableSlot], dominance: &Dominance);
}

/// Advisory counters kept by the default promoter
#[derive(Debug, Default, Clone, Copy)]
pub struct PromoterStats {
    pub phi_nodes_inserted: usize,
    pub loads_eliminated: usize,
    pub stores_eliminated: usize,
}

/// The default promoter: standard phi-insertion + renaming SSA construction
#[derive(Debug, Default)]
pub struct SsaPromoter {
    stats: PromoterStats,
}

/// Renaming state threaded through the dominator-tree walk
struct RenameState {
    /// Slots being promoted, for O(1) membership checks
    slot_ids: FxHashSet<ValueId>,
    /// Current reaching value per slot, pushed by stores and phi defs
    stacks: FxHashMap<ValueId, Vec<Value>>,
    /// Phi destination -> the slot it merges
    phi_owner: FxHashMap<ValueId, ValueId>,
    /// Eliminated load destinations and the values that replace them
    substitutions: FxHashMap<ValueId, Value>,
    /// Instruction sites to delete once the walk is done
    removals: Vec<(BasicBlockId, usize)>,
    /// Blocks visited by the walk (exactly the reachable blocks)
    visited: FxHashSet<BasicBlockId>,
}

impl SsaPromoter {
    pub const fn new() -> Self {
        Self {
            stats: PromoterStats {
                phi_nodes_inserted: 0,
                loads_eliminated: 0,
                stores_eliminated: 0,
            },
        }
    }

    /// Returns the advisory counters accumulated so far
    pub const fn stats(&self) -> &PromoterStats {
        &self.stats
    }

    /// Collects, per slot, the blocks containing stores to it
    fn collect_store_blocks(
        function: &MirFunction,
        slot_ids: &FxHashSet<ValueId>,
    ) -> FxHashMap<ValueId, FxHashSet<BasicBlockId>> {
        let mut store_blocks: FxHashMap<ValueId, FxHashSet<BasicBlockId>> = FxHashMap::default();

        for (block_id, block) in function.basic_blocks() {
            for instruction in &block.instructions {
                if let InstructionKind::Store {
                    address: Value::Operand(addr),
                    ..
                } = &instruction.kind
                {
                    if slot_ids.contains(addr) {
                        store_blocks.entry(*addr).or_default().insert(block_id);
                    }
                }
            }
        }

        store_blocks
    }

    /// Inserts an empty phi for `slot` at the front of every block in the
    /// iterated dominance frontier of its store blocks
    fn insert_phi_nodes(
        &mut self,
        function: &mut MirFunction,
        slots: &[PromotableSlot],
        store_blocks: &FxHashMap<ValueId, FxHashSet<BasicBlockId>>,
        dominance: &Dominance,
    ) -> FxHashMap<ValueId, ValueId> {
        let mut phi_owner = FxHashMap::default();

        for slot in slots {
            let Some(defs) = store_blocks.get(&slot.id) else {
                continue;
            };

            let mut phi_blocks: Vec<BasicBlockId> =
                dominance.iterated_frontier(defs).into_iter().collect();
            phi_blocks.sort_unstable();

            for phi_block in phi_blocks {
                let phi_dest = function.new_typed_value_id(slot.ty.clone());
                function.basic_blocks[phi_block]
                    .push_phi_front(Instruction::empty_phi(phi_dest, slot.ty.clone()));
                phi_owner.insert(phi_dest, slot.id);
                self.stats.phi_nodes_inserted += 1;
            }
        }

        phi_owner
    }

    /// Resolves a value through the load-substitution map
    ///
    /// Entries are resolved when inserted, so one lookup step suffices.
    fn resolve(state: &RenameState, value: Value) -> Value {
        match value {
            Value::Operand(id) => state.substitutions.get(&id).copied().unwrap_or(value),
            other => other,
        }
    }

    /// Renames one block, then recurses into its dominator-tree children
    fn rename_block(
        &mut self,
        function: &mut MirFunction,
        block_id: BasicBlockId,
        dominance: &Dominance,
        state: &mut RenameState,
    ) {
        state.visited.insert(block_id);
        let mut pushes: Vec<ValueId> = Vec::new();

        for idx in 0..function.basic_blocks[block_id].instructions.len() {
            let instruction = &function.basic_blocks[block_id].instructions[idx];
            match &instruction.kind {
                InstructionKind::Phi { dest, .. } => {
                    if let Some(&slot) = state.phi_owner.get(dest) {
                        let reaching = Value::operand(*dest);
                        state.stacks.entry(slot).or_default().push(reaching);
                        pushes.push(slot);
                    }
                }

                InstructionKind::Store {
                    address: Value::Operand(addr),
                    value,
                    ..
                } if state.slot_ids.contains(addr) => {
                    let resolved = Self::resolve(state, *value);
                    let slot = *addr;
                    state.stacks.entry(slot).or_default().push(resolved);
                    pushes.push(slot);
                    state.removals.push((block_id, idx));
                    self.stats.stores_eliminated += 1;
                }

                InstructionKind::Load {
                    dest,
                    address: Value::Operand(addr),
                    ..
                } if state.slot_ids.contains(addr) => {
                    // A load with no dominating store reads the error value
                    let reaching = state
                        .stacks
                        .get(addr)
                        .and_then(|stack| stack.last())
                        .copied()
                        .unwrap_or(Value::error());
                    state.substitutions.insert(*dest, reaching);
                    state.removals.push((block_id, idx));
                    self.stats.loads_eliminated += 1;
                }

                InstructionKind::StackAlloc { dest, .. } if state.slot_ids.contains(dest) => {
                    state.removals.push((block_id, idx));
                }

                _ => {}
            }
        }

        // Feed the current reaching values into successor phis; a branch with
        // both targets equal contributes a single predecessor edge
        let mut successors = function.basic_blocks[block_id].terminator.target_blocks();
        successors.dedup();
        for succ_id in successors {
            for instruction in function.basic_blocks[succ_id].instructions_mut() {
                let InstructionKind::Phi { dest, sources, .. } = &mut instruction.kind else {
                    break;
                };
                if let Some(slot) = state.phi_owner.get(dest) {
                    let reaching = state
                        .stacks
                        .get(slot)
                        .and_then(|stack| stack.last())
                        .copied()
                        .unwrap_or(Value::error());
                    sources.push((block_id, reaching));
                }
            }
        }

        for &child in dominance.children(block_id) {
            self.rename_block(function, child, dominance, state);
        }

        for slot in pushes.into_iter().rev() {
            if let Some(stack) = state.stacks.get_mut(&slot) {
                stack.pop();
            }
        }
    }

    /// Deletes slot accesses the renaming walk never reached
    ///
    /// Renaming only visits reachable blocks, but the contract says the input
    /// slots vanish entirely, so stale accesses in unreachable blocks are
    /// swept here.
    fn sweep_unreachable_blocks(&mut self, function: &mut MirFunction, state: &mut RenameState) {
        let block_ids: Vec<BasicBlockId> =
            function.basic_blocks().map(|(id, _)| id).collect();

        for block_id in block_ids {
            if state.visited.contains(&block_id) {
                continue;
            }
            for (idx, instruction) in function.basic_blocks[block_id].instructions.iter().enumerate()
            {
                match &instruction.kind {
                    InstructionKind::Store {
                        address: Value::Operand(addr),
                        ..
                    } if state.slot_ids.contains(addr) => {
                        state.removals.push((block_id, idx));
                    }
                    InstructionKind::Load {
                        dest,
                        address: Value::Operand(addr),
                        ..
                    } if state.slot_ids.contains(addr) => {
                        state.substitutions.insert(*dest, Value::error());
                        state.removals.push((block_id, idx));
                    }
                    InstructionKind::StackAlloc { dest, .. } if state.slot_ids.contains(dest) => {
                        state.removals.push((block_id, idx));
                    }
                    _ => {}
                }
            }
        }
    }
}

impl MemoryPromoter for SsaPromoter {
    fn promote(
        &mut self,
        function: &mut MirFunction,
        slots: &[PromotableSlot],
        dominance: &Dominance,
    ) {
        if slots.is_empty() {
            return;
        }

        let slot_ids: FxHashSet<ValueId> = slots.iter().map(|slot| slot.id).collect();
        let store_blocks = Self::collect_store_blocks(function, &slot_ids);
        let phi_owner = self.insert_phi_nodes(function, slots, &store_blocks, dominance);

        let mut state = RenameState {
            slot_ids,
            stacks: FxHashMap::default(),
            phi_owner,
            substitutions: FxHashMap::default(),
            removals: Vec::new(),
            visited: FxHashSet::default(),
        };

        let entry = function.entry_block;
        self.rename_block(function, entry, dominance, &mut state);
        self.sweep_unreachable_blocks(function, &mut state);

        // Repoint every consumer of an eliminated load at its reaching value
        for (load_dest, value) in &state.substitutions {
            function.replace_all_uses(*load_dest, *value);
            function.value_types.remove(load_dest);
        }

        // Delete the loads, stores and allocations, back to front per block
        let mut by_block: FxHashMap<BasicBlockId, Vec<usize>> = FxHashMap::default();
        for (block_id, idx) in state.removals {
            by_block.entry(block_id).or_default().push(idx);
        }
        for (block_id, mut indexes) in by_block {
            indexes.sort_unstable();
            indexes.dedup();
            for idx in indexes.into_iter().rev() {
                function.basic_blocks[block_id].instructions.remove(idx);
            }
        }

        for slot in slots {
            function.value_types.remove(&slot.id);
            function.value_names.remove(&slot.id);
        }

        log::debug!(
            "promoted {} slot(s) in '{}': {} phi(s), {} load(s), {} store(s) eliminated",
            slots.len(),
            function.name,
            self.stats.phi_nodes_inserted,
            self.stats.loads_eliminated,
            self.stats.stores_eliminated,
        );
    }
}

#[cfg(test)]
#[path = "mem2reg_tests.rs"]
mod tests;
