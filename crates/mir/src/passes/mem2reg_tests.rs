//! Tests for the default SSA promoter on hand-built CFGs.

use super::{MemoryPromoter, PromotableSlot, SsaPromoter};
use crate::analysis::Dominance;
use crate::testing::FunctionBuilder;
use crate::{InstructionKind, MirFunction, MirType, Terminator, Value};

fn promote_slots(function: &mut MirFunction, slots: &[PromotableSlot]) -> SsaPromoter {
    let mut promoter = SsaPromoter::new();
    let dominance = Dominance::compute(function);
    promoter.promote(function, slots, &dominance);
    promoter
}

fn int_slot(id: crate::ValueId) -> PromotableSlot {
    PromotableSlot {
        id,
        ty: MirType::int(),
    }
}

#[test]
fn straight_line_store_then_load() {
    let mut b = FunctionBuilder::new("straight");
    let slot = b.stack_alloc(MirType::int());
    b.store(slot, Value::integer(42));
    let loaded = b.load(slot);
    b.return_value(Value::operand(loaded));
    let mut function = b.build();

    let promoter = promote_slots(&mut function, &[int_slot(slot)]);

    // The slot and its accesses are gone; the return carries the constant
    let entry = &function.basic_blocks[function.entry_block];
    assert!(entry.instructions.is_empty());
    assert_eq!(entry.terminator, Terminator::return_value(Value::integer(42)));

    let stats = promoter.stats();
    assert_eq!(stats.stores_eliminated, 1);
    assert_eq!(stats.loads_eliminated, 1);
    assert_eq!(stats.phi_nodes_inserted, 0);
    assert!(function.validate().is_ok());
}

#[test]
fn diamond_merges_with_phi() {
    let mut b = FunctionBuilder::new("diamond");
    let left = b.add_block();
    let right = b.add_block();
    let merge = b.add_block();

    let slot = b.stack_alloc(MirType::int());
    let cond = b.assign(Value::boolean(true), MirType::bool());
    b.branch(Value::operand(cond), left, right);

    b.switch_to(left);
    b.store(slot, Value::integer(1));
    b.jump_to(merge);

    b.switch_to(right);
    b.store(slot, Value::integer(2));
    b.terminate(Terminator::jump(merge));

    b.switch_to(merge);
    let loaded = b.load(slot);
    b.return_value(Value::operand(loaded));
    let mut function = b.build();

    let promoter = promote_slots(&mut function, &[int_slot(slot)]);

    // A phi at the merge picks the per-arm constants
    let merge_block = &function.basic_blocks[merge];
    assert_eq!(merge_block.phi_count(), 1);
    let InstructionKind::Phi { dest, sources, .. } = &merge_block.instructions[0].kind else {
        panic!("expected a phi at the merge block");
    };
    let mut sources = sources.clone();
    sources.sort_by_key(|(block, _)| *block);
    assert_eq!(
        sources,
        vec![(left, Value::integer(1)), (right, Value::integer(2))]
    );
    assert_eq!(
        merge_block.terminator,
        Terminator::return_value(Value::operand(*dest))
    );

    assert_eq!(promoter.stats().phi_nodes_inserted, 1);
    assert!(function.validate().is_ok());
}

#[test]
fn loop_carried_value_gets_header_phi() {
    let mut b = FunctionBuilder::new("loop");
    let header = b.add_block();
    let body = b.add_block();
    let exit = b.add_block();

    let slot = b.stack_alloc(MirType::int());
    b.store(slot, Value::integer(0));
    b.jump_to(header);

    let loaded = b.load(slot);
    let cond = b.assign(Value::boolean(false), MirType::bool());
    b.branch(Value::operand(cond), body, exit);

    b.switch_to(body);
    b.store(slot, Value::integer(5));
    b.terminate(Terminator::jump(header));

    b.switch_to(exit);
    b.return_value(Value::operand(loaded));
    let mut function = b.build();

    let entry = function.entry_block;
    promote_slots(&mut function, &[int_slot(slot)]);

    // The back edge forces a phi at the header merging both stores
    let header_block = &function.basic_blocks[header];
    assert_eq!(header_block.phi_count(), 1);
    let InstructionKind::Phi { dest, sources, .. } = &header_block.instructions[0].kind else {
        panic!("expected a phi at the loop header");
    };
    let mut sources = sources.clone();
    sources.sort_by_key(|(block, _)| *block);
    assert_eq!(
        sources,
        vec![(entry, Value::integer(0)), (body, Value::integer(5))]
    );

    // The load in the header resolved to the phi, flowing into the return
    assert_eq!(
        function.basic_blocks[exit].terminator,
        Terminator::return_value(Value::operand(*dest))
    );
    assert!(function.validate().is_ok());
}

#[test]
fn store_only_slot_vanishes() {
    let mut b = FunctionBuilder::new("store_only");
    let slot = b.stack_alloc(MirType::int());
    b.store(slot, Value::integer(7));
    b.return_void();
    let mut function = b.build();

    let promoter = promote_slots(&mut function, &[int_slot(slot)]);

    assert!(function.basic_blocks[function.entry_block]
        .instructions
        .is_empty());
    assert_eq!(promoter.stats().stores_eliminated, 1);
    assert_eq!(promoter.stats().loads_eliminated, 0);
    assert!(function.validate().is_ok());
}

#[test]
fn load_without_dominating_store_reads_error() {
    let mut b = FunctionBuilder::new("uninit");
    let slot = b.stack_alloc(MirType::int());
    let loaded = b.load(slot);
    b.store(slot, Value::integer(1));
    b.return_value(Value::operand(loaded));
    let mut function = b.build();

    promote_slots(&mut function, &[int_slot(slot)]);

    assert_eq!(
        function.basic_blocks[function.entry_block].terminator,
        Terminator::return_value(Value::error())
    );
}

#[test]
fn unreachable_block_accesses_are_swept() {
    let mut b = FunctionBuilder::new("unreachable");
    let slot = b.stack_alloc(MirType::int());
    b.store(slot, Value::integer(3));
    let loaded = b.load(slot);
    b.return_value(Value::operand(loaded));

    // A block no terminator ever targets, still touching the slot
    let orphan = b.add_block();
    b.switch_to(orphan);
    b.store(slot, Value::integer(9));
    let orphan_load = b.load(slot);
    b.return_value(Value::operand(orphan_load));
    let mut function = b.build();

    promote_slots(&mut function, &[int_slot(slot)]);

    // The slot vanished everywhere, reachable or not
    for (_, block) in function.basic_blocks() {
        assert!(block.instructions.is_empty());
    }
    assert_eq!(
        function.basic_blocks[orphan].terminator,
        Terminator::return_value(Value::error())
    );
}

#[test]
fn only_listed_slots_are_touched() {
    let mut b = FunctionBuilder::new("selective");
    let promoted = b.stack_alloc(MirType::int());
    let kept = b.stack_alloc(MirType::int());
    b.store(promoted, Value::integer(1));
    b.store(kept, Value::integer(2));
    let loaded = b.load(kept);
    b.return_value(Value::operand(loaded));
    let mut function = b.build();

    promote_slots(&mut function, &[int_slot(promoted)]);

    // The unlisted slot keeps its allocation, store and load
    let entry = &function.basic_blocks[function.entry_block];
    assert_eq!(entry.instructions.len(), 3);
    assert!(matches!(
        entry.instructions[0].kind,
        InstructionKind::StackAlloc { dest, .. } if dest == kept
    ));
    assert!(function.validate().is_ok());
}
