//! # Scalar Replacement Pass
//!
//! This pass eliminates unnecessary stack-allocated memory by interleaving two
//! rewrites to a fixed point:
//!
//! 1. **Promotion**: scalar slots used only through non-volatile whole-value
//!    loads and stores are handed to the [`MemoryPromoter`], which replaces
//!    the memory traffic with direct SSA value flow.
//! 2. **Expansion**: aggregate slots whose entire use-set decomposes into
//!    independent per-field access chains are split into one scalar slot per
//!    field.
//!
//! The two feed each other: splitting an aggregate exposes fresh scalar slots
//! for promotion, and promoting a slot can expose new splitting opportunities,
//! so the driver alternates them until one full cycle changes nothing.
//!
//! ## Legality
//!
//! A slot is *promotable* iff its allocated type is scalar-like, the
//! allocation is not volatile, and every use is a non-volatile load from it or
//! a non-volatile store to it. Storing the slot's address somewhere, passing
//! it to a call, branching on it, or any volatile access disqualifies it.
//!
//! A slot is *expandable* iff its type is an aggregate and every use is either
//! a field projection with a constant in-range index whose own uses are
//! themselves loads, stores, or recursively valid projections, or an
//! equality comparison against the null address constant. Null comparisons are
//! folded to their known boolean result during classification (a stack address
//! is never null), and the fold stands even when a later use disqualifies the
//! slot. Volatile accesses through a projection do not block expansion; the
//! receiving field slot simply stays unpromotable.
//!
//! Each field slot produced by expansion inherits the original allocation's
//! volatility flag and is named by appending the field index to the original
//! slot's name.

use rustc_hash::FxHashMap;

use crate::{
    analysis::Dominance, BasicBlockId, BinaryOp, Instruction, InstructionKind, MirFunction,
    MirType, PrettyPrint, Value, ValueId,
};

use super::mem2reg::{MemoryPromoter, PromotableSlot, SsaPromoter};
use super::MirPass;

/// Guard against a non-converging driver; any realistic function converges
/// within (aggregate nesting depth + scalar slot count) iterations.
const MAX_ITERATIONS: usize = 1000;

#[derive(Clone, Copy, Debug)]
pub struct ScalarReplacementConfig {
    /// Hand promotable scalar slots to the memory promoter
    pub enable_promotion: bool,
    /// Split expandable aggregate slots into per-field slots
    pub enable_expansion: bool,
    /// Aggregates with more fields than this are rejected, not split
    pub max_expanded_fields: usize,
}

impl Default for ScalarReplacementConfig {
    fn default() -> Self {
        Self {
            enable_promotion: true,
            enable_expansion: true,
            max_expanded_fields: 16,
        }
    }
}

/// Advisory counters, accumulated across every function the pass instance runs on
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarReplacementStats {
    pub slots_promoted: usize,
    pub aggregates_expanded: usize,
    pub null_comparisons_folded: usize,
    pub iterations: usize,
}

/// An aggregate slot cleared for splitting by the legality scan
#[derive(Debug)]
struct ExpandableAggregate {
    id: ValueId,
    ty: MirType,
    volatile: bool,
}

/// The fixed-point driver combining promotion and expansion
///
/// The promoter is an injected strategy so tests can observe or replace the
/// SSA construction; production use goes through [`ScalarReplacement::new`],
/// which wires in the default [`SsaPromoter`].
#[derive(Debug)]
pub struct ScalarReplacement<P = SsaPromoter> {
    config: ScalarReplacementConfig,
    stats: ScalarReplacementStats,
    promoter: P,
}

impl ScalarReplacement {
    pub const fn new() -> Self {
        Self {
            config: ScalarReplacementConfig {
                enable_promotion: true,
                enable_expansion: true,
                max_expanded_fields: 16,
            },
            stats: ScalarReplacementStats {
                slots_promoted: 0,
                aggregates_expanded: 0,
                null_comparisons_folded: 0,
                iterations: 0,
            },
            promoter: SsaPromoter::new(),
        }
    }

    pub const fn with_config(config: ScalarReplacementConfig) -> Self {
        let mut pass = Self::new();
        pass.config = config;
        pass
    }
}

impl Default for ScalarReplacement {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: MemoryPromoter> ScalarReplacement<P> {
    /// Creates the pass with a caller-supplied promotion strategy
    pub fn with_promoter(promoter: P) -> Self {
        Self {
            config: ScalarReplacementConfig::default(),
            stats: ScalarReplacementStats::default(),
            promoter,
        }
    }

    /// Returns the counters accumulated so far
    pub const fn stats(&self) -> &ScalarReplacementStats {
        &self.stats
    }

    /// Returns the promotion strategy in use
    pub const fn promoter(&self) -> &P {
        &self.promoter
    }

    /// Runs promotion and expansion on one function until neither fires
    pub fn run_to_fixed_point(&mut self, function: &mut MirFunction) {
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                log::warn!(
                    "scalar replacement did not converge on '{}' after {MAX_ITERATIONS} iterations",
                    function.name
                );
                break;
            }
            self.stats.iterations += 1;

            log::trace!(
                "scalar replacement iteration {iterations} on '{}':\n{}",
                function.name,
                function.pretty_print(0)
            );

            let mut promoted = 0;
            if self.config.enable_promotion {
                let slots = collect_promotable(function);
                if !slots.is_empty() {
                    // The CFG may have changed since the last iteration
                    let dominance = Dominance::compute(function);
                    self.promoter.promote(function, &slots, &dominance);
                    promoted = slots.len();
                }
            }

            let mut expanded = 0;
            if self.config.enable_expansion {
                for aggregate in self.collect_expandable(function) {
                    self.expand_aggregate(function, &aggregate);
                    expanded += 1;
                }
            }

            self.stats.slots_promoted += promoted;
            self.stats.aggregates_expanded += expanded;

            if promoted == 0 && expanded == 0 {
                break;
            }
        }

        log::debug!(
            "scalar replacement converged on '{}': {} slot(s) promoted, {} aggregate(s) \
             expanded, {} null comparison(s) folded, {} iteration(s)",
            function.name,
            self.stats.slots_promoted,
            self.stats.aggregates_expanded,
            self.stats.null_comparisons_folded,
            self.stats.iterations,
        );
    }

    /// Collects the aggregate slots whose whole use-set classifies cleanly
    ///
    /// Every allocation is classified, regardless of its type, so that null
    /// comparisons against scalar slot addresses fold too; only aggregates
    /// within the configured field limit enter the result.
    fn collect_expandable(&mut self, function: &mut MirFunction) -> Vec<ExpandableAggregate> {
        // Snapshot in declaration order; classification mutates instructions
        // in place (null folds) but never adds or removes any
        let mut allocations = Vec::new();
        for (_, block) in function.basic_blocks() {
            for instruction in &block.instructions {
                if let InstructionKind::StackAlloc { dest, ty, volatile } = &instruction.kind {
                    allocations.push((*dest, ty.clone(), *volatile));
                }
            }
        }

        let mut expandable = Vec::new();
        for (id, ty, volatile) in allocations {
            if !self.classify_allocation(function, id) {
                continue;
            }
            if !ty.is_aggregate() {
                continue;
            }
            if ty.field_count() > self.config.max_expanded_fields {
                log::trace!(
                    "slot %{} has {} fields, above the expansion limit of {}",
                    id.index(),
                    ty.field_count(),
                    self.config.max_expanded_fields
                );
                continue;
            }
            expandable.push(ExpandableAggregate { id, ty, volatile });
        }

        expandable
    }

    /// Returns true if every use of the allocation's address is a valid
    /// field-access chain or a (now folded) null comparison
    fn classify_allocation(&mut self, function: &mut MirFunction, addr: ValueId) -> bool {
        let (sites, used_by_terminator) = use_sites(function, addr);
        if used_by_terminator {
            return false;
        }

        for site in sites {
            if !self.classify_use(function, addr, site) {
                // Folds committed before this point stand; the fold is sound
                // whether or not the slot is ever split
                return false;
            }
        }

        true
    }

    /// Classifies one use of the address `addr` at the given instruction site
    fn classify_use(
        &mut self,
        function: &mut MirFunction,
        addr: ValueId,
        (block_id, idx): (BasicBlockId, usize),
    ) -> bool {
        let addr_val = Value::operand(addr);
        let instruction = &function.basic_blocks[block_id].instructions[idx];

        match &instruction.kind {
            InstructionKind::FieldAddr { dest, base, index } if *base == addr_val => {
                // A non-constant field index makes the whole slot opaque
                if index.as_const_index().is_none() {
                    return false;
                }
                let projection = *dest;
                self.classify_projection(function, projection)
            }

            InstructionKind::BinaryOp {
                op,
                dest,
                left,
                right,
            } if op.is_equality()
                && ((*left == addr_val && right.is_null())
                    || (*right == addr_val && left.is_null())) =>
            {
                // A stack slot's address is never null, so the result is
                // known; rewrite in place and accept the use
                let result = Value::boolean(matches!(op, BinaryOp::Neq));
                let dest = *dest;
                function.basic_blocks[block_id].instructions[idx] =
                    Instruction::assign(dest, result, MirType::bool());
                self.stats.null_comparisons_folded += 1;
                true
            }

            _ => false,
        }
    }

    /// Classifies every use of a field projection's address
    ///
    /// Loads and stores addressing the projection are accepted, volatile ones
    /// included; anything else goes back through [`Self::classify_use`] to
    /// handle chained projections and null comparisons.
    fn classify_projection(&mut self, function: &mut MirFunction, projection: ValueId) -> bool {
        let (sites, used_by_terminator) = use_sites(function, projection);
        if used_by_terminator {
            return false;
        }

        let projection_val = Value::operand(projection);
        for (block_id, idx) in sites {
            let instruction = &function.basic_blocks[block_id].instructions[idx];
            match &instruction.kind {
                InstructionKind::Load { address, .. } if *address == projection_val => {}

                InstructionKind::Store { address, value, .. }
                    if *address == projection_val && *value != projection_val => {}

                _ => {
                    if !self.classify_use(function, projection, (block_id, idx)) {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Splits one expandable aggregate slot into per-field slots
    ///
    /// The replacement slots are inserted immediately before the original
    /// allocation, in field order; every projection off the aggregate is
    /// repointed at its field's slot and deleted along with the original
    /// allocation.
    fn expand_aggregate(&mut self, function: &mut MirFunction, aggregate: &ExpandableAggregate) {
        let fields: Vec<MirType> = aggregate
            .ty
            .field_types()
            .unwrap_or_else(|| {
                panic!(
                    "expandable slot %{} has non-aggregate type {}",
                    aggregate.id.index(),
                    aggregate.ty
                )
            })
            .to_vec();

        let (alloc_block, alloc_idx) = find_allocation_site(function, aggregate.id);
        let base_name = function.get_value_name(aggregate.id).map(str::to_string);

        let mut replacements = Vec::with_capacity(fields.len());
        for (i, field_ty) in fields.iter().enumerate() {
            let slot = function.new_typed_value_id(MirType::pointer(field_ty.clone()));
            if let Some(name) = &base_name {
                function.set_value_name(slot, format!("{name}_{i}"));
            }
            replacements.push(slot);
        }

        for (i, (&slot, field_ty)) in replacements.iter().zip(&fields).enumerate() {
            let instruction = if aggregate.volatile {
                Instruction::volatile_stack_alloc(slot, field_ty.clone())
            } else {
                Instruction::stack_alloc(slot, field_ty.clone())
            };
            function.basic_blocks[alloc_block]
                .instructions
                .insert(alloc_idx + i, instruction);
        }

        // Collect every projection off the original slot before rewriting
        let mut projections: Vec<(BasicBlockId, usize, ValueId, usize)> = Vec::new();
        for (block_id, block) in function.basic_blocks() {
            for (idx, instruction) in block.instructions.iter().enumerate() {
                if let InstructionKind::FieldAddr { dest, base, index } = &instruction.kind {
                    if *base == Value::operand(aggregate.id) {
                        let field_index = index.as_const_index().unwrap_or_else(|| {
                            panic!(
                                "field projection %{} with non-constant index survived \
                                 legality analysis",
                                dest.index()
                            )
                        });
                        assert!(
                            field_index < replacements.len(),
                            "field projection index {field_index} out of range for \
                             aggregate {} with {} fields",
                            aggregate.ty,
                            replacements.len()
                        );
                        projections.push((block_id, idx, *dest, field_index));
                    }
                }
            }
        }

        for &(_, _, projection, field_index) in &projections {
            function.replace_all_uses(projection, Value::operand(replacements[field_index]));
            function.value_types.remove(&projection);
            function.value_names.remove(&projection);
        }

        // Delete the projections and the original allocation, back to front
        let mut by_block: FxHashMap<BasicBlockId, Vec<usize>> = FxHashMap::default();
        for (block_id, idx, _, _) in projections {
            by_block.entry(block_id).or_default().push(idx);
        }
        by_block
            .entry(alloc_block)
            .or_default()
            .push(alloc_idx + fields.len());
        for (block_id, mut indexes) in by_block {
            indexes.sort_unstable();
            for idx in indexes.into_iter().rev() {
                function.basic_blocks[block_id].instructions.remove(idx);
            }
        }

        function.value_types.remove(&aggregate.id);
        function.value_names.remove(&aggregate.id);

        debug_assert!(
            !function
                .get_value_use_counts()
                .contains_key(&aggregate.id),
            "stale use of split slot %{}",
            aggregate.id.index()
        );
    }
}

impl<P: MemoryPromoter> MirPass for ScalarReplacement<P> {
    fn run(&mut self, function: &mut MirFunction) -> bool {
        self.run_to_fixed_point(function);
        // The analyzers always ran, and null folds happen even when nothing
        // is promoted or expanded, so the function is reported as changed
        true
    }

    fn name(&self) -> &'static str {
        "ScalarReplacement"
    }
}

/// Collects the scalar slots whose whole use-set is plain memory traffic
///
/// Slots appear in declaration order. Zero-use slots are skipped: deleting
/// dead slots is dead-code elimination's business.
fn collect_promotable(function: &MirFunction) -> Vec<PromotableSlot> {
    let mut slots = Vec::new();

    for (_, block) in function.basic_blocks() {
        for instruction in &block.instructions {
            if let InstructionKind::StackAlloc { dest, ty, volatile } = &instruction.kind {
                if *volatile || !ty.is_scalar() {
                    continue;
                }
                if is_promotable(function, *dest) {
                    slots.push(PromotableSlot {
                        id: *dest,
                        ty: ty.clone(),
                    });
                }
            }
        }
    }

    slots
}

/// Returns true if every use of the slot's address is a non-volatile
/// whole-value load or store addressing it
///
/// The scan stops at the first disqualifying use. Slots with no uses at all
/// do not qualify.
fn is_promotable(function: &MirFunction, addr: ValueId) -> bool {
    let addr_val = Value::operand(addr);
    let mut uses = 0usize;

    for (_, block) in function.basic_blocks() {
        if block.terminator.used_values().contains(&addr) {
            return false;
        }

        for instruction in &block.instructions {
            match &instruction.kind {
                InstructionKind::Load {
                    address, volatile, ..
                } if *address == addr_val => {
                    if *volatile {
                        return false;
                    }
                    uses += 1;
                }

                InstructionKind::Store {
                    address,
                    value,
                    volatile,
                    ..
                } => {
                    // The address escaping as a stored value disqualifies
                    if *value == addr_val {
                        return false;
                    }
                    if *address == addr_val {
                        if *volatile {
                            return false;
                        }
                        uses += 1;
                    }
                }

                _ => {
                    if instruction.used_values().contains(&addr) {
                        return false;
                    }
                }
            }
        }
    }

    uses > 0
}

/// Returns the instruction sites using `id`, plus whether any terminator does
fn use_sites(function: &MirFunction, id: ValueId) -> (Vec<(BasicBlockId, usize)>, bool) {
    let mut sites = Vec::new();
    let mut used_by_terminator = false;

    for (block_id, block) in function.basic_blocks() {
        for (idx, instruction) in block.instructions.iter().enumerate() {
            if instruction.used_values().contains(&id) {
                sites.push((block_id, idx));
            }
        }
        if block.terminator.used_values().contains(&id) {
            used_by_terminator = true;
        }
    }

    (sites, used_by_terminator)
}

/// Locates the defining `StackAlloc` of a slot
fn find_allocation_site(function: &MirFunction, slot: ValueId) -> (BasicBlockId, usize) {
    for (block_id, block) in function.basic_blocks() {
        for (idx, instruction) in block.instructions.iter().enumerate() {
            if let InstructionKind::StackAlloc { dest, .. } = &instruction.kind {
                if *dest == slot {
                    return (block_id, idx);
                }
            }
        }
    }
    panic!("slot %{} has no defining allocation", slot.index());
}

#[cfg(test)]
#[path = "scalar_repl_tests.rs"]
mod tests;
