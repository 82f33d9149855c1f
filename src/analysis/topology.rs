use super::graph::DepGraph;
use super::ConfigError;
use crate::store::{AttrId, AttributeRegistry};
use std::collections::{HashSet, VecDeque};

/// Topological sort via depth-first search.
///
/// Returns the attribute ids ordered so that every dependency appears
/// before its consumers. All nodes are visited, including disconnected
/// base attributes, so one pass over the result covers the whole store.
pub fn sort(graph: &DepGraph, attrs: &AttributeRegistry) -> Result<Vec<AttrId>, ConfigError> {
    let count = graph.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];

    for i in 0..count {
        if state[i] == VisitState::None {
            visit(AttrId::new(i), graph, attrs, &mut state, &mut order)?;
        }
    }

    Ok(order)
}

#[derive(Clone, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

fn visit(
    node: AttrId,
    graph: &DepGraph,
    attrs: &AttributeRegistry,
    state: &mut Vec<VisitState>,
    order: &mut Vec<AttrId>,
) -> Result<(), ConfigError> {
    let idx = node.index();

    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => {
            return Err(ConfigError::Cycle {
                attribute: attrs.name(node).to_string(),
            })
        }
        VisitState::None => state[idx] = VisitState::Visiting,
    }

    for &parent in graph.get_parents(node) {
        visit(parent, graph, attrs, state, order)?;
    }

    state[idx] = VisitState::Visited;
    order.push(node);
    Ok(())
}

/// All nodes reachable downstream from the given start nodes, the starts
/// included. Used for incremental invalidation after a base write.
pub fn downstream_from(graph: &DepGraph, start_nodes: &[AttrId]) -> HashSet<AttrId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start_nodes.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            graph.for_each_child(node, |child| queue.push_back(child));
        }
    }
    visited
}
