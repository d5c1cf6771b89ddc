//! # Dominance Analysis
//!
//! This module computes the dominator tree and dominance frontiers for a
//! control flow graph. These are the analyses the memory promoter needs to
//! place phi nodes and rename values.
//!
//! ## Dominator Tree
//! A node X dominates a node Y if every path from the entry node to Y must pass through X.
//! The immediate dominator of a node is its closest strict dominator.
//!
//! ## Dominance Frontiers
//! The dominance frontier of a node X is the set of nodes Y such that:
//! - X dominates a predecessor of Y, but
//! - X does not strictly dominate Y

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{cfg, BasicBlockId, MirFunction};

/// Dominance information for one function, built from its current CFG
///
/// The structure is a snapshot: passes rebuild it after mutating control
/// flow rather than patching it incrementally.
#[derive(Debug)]
pub struct Dominance {
    /// Immediate dominator of each block; the entry block has none
    idom: FxHashMap<BasicBlockId, BasicBlockId>,

    /// Dominator-tree children, sorted so tree walks are deterministic
    children: FxHashMap<BasicBlockId, Vec<BasicBlockId>>,

    /// Dominance frontier of each reachable block
    frontiers: FxHashMap<BasicBlockId, FxHashSet<BasicBlockId>>,
}

impl Dominance {
    /// Computes dominance information using the Cooper-Harvey-Kennedy algorithm
    ///
    /// This is an iterative algorithm that computes immediate dominators
    /// directly: process blocks in reverse postorder, intersecting the
    /// candidate dominators of each block's processed predecessors until a
    /// fixed point is reached.
    pub fn compute(function: &MirFunction) -> Self {
        let entry = function.entry_block;

        let rpo = compute_reverse_postorder(function);
        let mut rpo_number = FxHashMap::default();
        for (i, &block) in rpo.iter().enumerate() {
            rpo_number.insert(block, i);
        }

        let mut idom = FxHashMap::default();
        idom.insert(entry, entry);

        let predecessors = cfg::build_predecessor_map(function);

        let mut changed = true;
        while changed {
            changed = false;

            for &block in rpo.iter().skip(1) {
                let Some(preds) = predecessors.get(&block) else {
                    continue;
                };

                // First processed predecessor seeds the intersection
                let Some(&first) = preds.iter().find(|p| idom.contains_key(p)) else {
                    continue;
                };

                let mut current_idom = first;
                for &pred in preds {
                    if pred != first && idom.contains_key(&pred) {
                        current_idom = intersect(pred, current_idom, &idom, &rpo_number);
                    }
                }

                if idom.get(&block) != Some(&current_idom) {
                    idom.insert(block, current_idom);
                    changed = true;
                }
            }
        }

        // The entry's self-loop was only needed during iteration
        idom.remove(&entry);

        let mut children: FxHashMap<BasicBlockId, Vec<BasicBlockId>> = FxHashMap::default();
        for (&child, &parent) in &idom {
            children.entry(parent).or_default().push(child);
        }
        for child_list in children.values_mut() {
            child_list.sort_unstable();
        }

        let frontiers = compute_dominance_frontiers(function, &idom, &predecessors);

        Self {
            idom,
            children,
            frontiers,
        }
    }

    /// Returns the immediate dominator of a block, if it has one
    pub fn immediate_dominator(&self, block: BasicBlockId) -> Option<BasicBlockId> {
        self.idom.get(&block).copied()
    }

    /// Returns the dominator-tree children of a block
    pub fn children(&self, block: BasicBlockId) -> &[BasicBlockId] {
        self.children.get(&block).map_or(&[], Vec::as_slice)
    }

    /// Returns the dominance frontier of a block
    pub fn frontier(&self, block: BasicBlockId) -> Option<&FxHashSet<BasicBlockId>> {
        self.frontiers.get(&block)
    }

    /// Computes the iterated dominance frontier of a set of blocks
    ///
    /// This is the phi-placement set: given the blocks containing stores to a
    /// slot, the iterated frontier is exactly the set of blocks that need a
    /// phi for that slot.
    pub fn iterated_frontier(&self, blocks: &FxHashSet<BasicBlockId>) -> FxHashSet<BasicBlockId> {
        let mut result = FxHashSet::default();
        let mut worklist: Vec<BasicBlockId> = blocks.iter().copied().collect();
        let mut processed = FxHashSet::default();

        while let Some(block) = worklist.pop() {
            if !processed.insert(block) {
                continue;
            }
            if let Some(frontier) = self.frontiers.get(&block) {
                for &frontier_block in frontier {
                    if result.insert(frontier_block) {
                        worklist.push(frontier_block);
                    }
                }
            }
        }

        result
    }
}

/// Cooper's intersect function for finding the common dominator
fn intersect(
    mut b1: BasicBlockId,
    mut b2: BasicBlockId,
    idom: &FxHashMap<BasicBlockId, BasicBlockId>,
    rpo_number: &FxHashMap<BasicBlockId, usize>,
) -> BasicBlockId {
    while b1 != b2 {
        while rpo_number[&b1] > rpo_number[&b2] {
            b1 = idom[&b1];
        }
        while rpo_number[&b2] > rpo_number[&b1] {
            b2 = idom[&b2];
        }
    }
    b1
}

/// Computes the reachable blocks in reverse postorder
fn compute_reverse_postorder(function: &MirFunction) -> Vec<BasicBlockId> {
    let mut visited = FxHashSet::default();
    let mut postorder = Vec::new();

    fn dfs(
        block: BasicBlockId,
        function: &MirFunction,
        visited: &mut FxHashSet<BasicBlockId>,
        postorder: &mut Vec<BasicBlockId>,
    ) {
        if !visited.insert(block) {
            return;
        }

        for successor in function.basic_blocks[block].terminator.target_blocks() {
            dfs(successor, function, visited, postorder);
        }

        postorder.push(block);
    }

    dfs(function.entry_block, function, &mut visited, &mut postorder);
    postorder.reverse();
    postorder
}

/// Computes dominance frontiers with the standard two-loop algorithm
///
/// For each join block B (two or more predecessors), walk up the dominator
/// tree from each predecessor until reaching idom(B), adding B to the
/// frontier of every block on the path.
fn compute_dominance_frontiers(
    function: &MirFunction,
    idom: &FxHashMap<BasicBlockId, BasicBlockId>,
    predecessors: &FxHashMap<BasicBlockId, Vec<BasicBlockId>>,
) -> FxHashMap<BasicBlockId, FxHashSet<BasicBlockId>> {
    let mut frontiers: FxHashMap<BasicBlockId, FxHashSet<BasicBlockId>> = FxHashMap::default();

    for (block_id, _) in function.basic_blocks.iter_enumerated() {
        frontiers.insert(block_id, FxHashSet::default());
    }

    for (block_id, _) in function.basic_blocks.iter_enumerated() {
        let Some(preds) = predecessors.get(&block_id) else {
            continue;
        };
        if preds.len() < 2 {
            continue;
        }

        let block_idom = idom.get(&block_id);
        for &pred in preds {
            // Unreachable predecessors have no idom entry and no frontier
            if pred != function.entry_block && !idom.contains_key(&pred) {
                continue;
            }

            let mut runner = pred;
            while Some(&runner) != block_idom {
                frontiers.entry(runner).or_default().insert(block_id);

                if let Some(&next) = idom.get(&runner) {
                    runner = next;
                } else {
                    break;
                }
            }
        }
    }

    frontiers
}
