//! The derivation graph over attribute ids.
//!
//! Dense columnar layout: CSR parent ranges for upstream walks, a child
//! linked-list for downstream walks. One node per interned attribute; the
//! parents of a rule target are its step sources plus every attribute its
//! formulas reference.

use crate::rules::RuleSet;
use crate::store::AttrId;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    // Dense Topology
    parents_flat: Vec<AttrId>,
    parents_ranges: Vec<(u32, u32)>, // (start, count)

    // Adjacency List (Children)
    first_child: Vec<u32>,
    child_targets: Vec<AttrId>,
    next_child: Vec<u32>,
}

impl DepGraph {
    /// Builds the graph for `attr_count` attributes from the registered
    /// rules. Attributes without a rule are source nodes with no parents.
    pub fn build(attr_count: usize, rules: &RuleSet) -> Self {
        let mut graph = DepGraph {
            parents_flat: Vec::new(),
            parents_ranges: Vec::with_capacity(attr_count),
            first_child: vec![u32::MAX; attr_count],
            child_targets: Vec::new(),
            next_child: Vec::new(),
        };

        let mut refs = Vec::new();
        let mut seen = HashSet::new();
        for i in 0..attr_count {
            let id = AttrId::new(i);
            let start = graph.parents_flat.len() as u32;

            refs.clear();
            seen.clear();
            for step in rules.steps(id) {
                refs.push(step.source);
                step.expr.collect_refs(&mut refs);
            }

            for &parent in &refs {
                // Duplicate mentions of the same upstream collapse to one
                // edge; a self-reference stays and will fail the sort.
                if !seen.insert(parent) {
                    continue;
                }
                graph.parents_flat.push(parent);

                let head = graph.first_child[parent.index()];
                let new_edge = graph.child_targets.len() as u32;
                graph.child_targets.push(id);
                graph.next_child.push(head);
                graph.first_child[parent.index()] = new_edge;
            }

            let count = graph.parents_flat.len() as u32 - start;
            graph.parents_ranges.push((start, count));
        }

        graph
    }

    pub fn count(&self) -> usize {
        self.parents_ranges.len()
    }

    #[inline(always)]
    pub fn get_parents(&self, id: AttrId) -> &[AttrId] {
        let (start, count) = self.parents_ranges[id.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    /// Iterates the direct dependents of `id` via the child linked-list.
    pub fn for_each_child(&self, id: AttrId, mut f: impl FnMut(AttrId)) {
        let mut edge_idx = self.first_child[id.index()];
        while edge_idx != u32::MAX {
            f(self.child_targets[edge_idx as usize]);
            edge_idx = self.next_child[edge_idx as usize];
        }
    }
}
