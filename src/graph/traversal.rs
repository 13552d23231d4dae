//! Direction-aware traversal over the ownership graph.

use std::collections::{HashSet, VecDeque};

use super::{NodeId, OwnershipGraph};

/// Which edges to follow from a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards owners and operators (incoming edges)
    Up,
    /// Towards holdings and operated media (outgoing edges)
    Down,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = crate::error::KekError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "both" => Ok(Direction::Both),
            other => Err(crate::error::KekError::InvalidInput(format!(
                "direction must be up, down or both; got '{}'",
                other
            ))),
        }
    }
}

/// Collect every node reachable from `start`, the start node first.
///
/// Each node is emitted exactly once; cycles terminate through the visited set.
pub fn traverse_nodes(graph: &OwnershipGraph, start: NodeId, direction: Direction) -> Vec<NodeId> {
    if graph.node(start).is_none() {
        return Vec::new();
    }

    let go_up = matches!(direction, Direction::Up | Direction::Both);
    let go_down = matches!(direction, Direction::Down | Direction::Both);

    let mut visited = HashSet::new();
    let mut todo = VecDeque::new();
    let mut result = Vec::new();

    todo.push_back(start);
    visited.insert(start);

    while let Some(id) = todo.pop_front() {
        result.push(id);
        let Some(node) = graph.node(id) else {
            continue;
        };

        let up = node.nodes_in.iter().filter(|_| go_up);
        let down = node.nodes_out.iter().filter(|_| go_down);
        for adj in up.chain(down) {
            if visited.insert(adj.id) {
                todo.push_back(adj.id);
            }
        }
    }

    result
}

/// Nodes shown for a selected entity: everything above it, then the entity
/// and everything below it.
pub fn selection_subgraph(graph: &OwnershipGraph, start: NodeId) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = traverse_nodes(graph, start, Direction::Up)
        .into_iter()
        .skip(1)
        .collect();
    nodes.extend(traverse_nodes(graph, start, Direction::Down));
    nodes
}
