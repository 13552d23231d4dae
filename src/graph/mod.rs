//! Ownership graph: shareholders and media as nodes, `owns` / `operates` edges.
//!
//! Built from the archive, persisted as `graph.dot`, and traversed to select
//! the part of the network shown around one entity.

mod build;
mod dot;
mod stats;
mod traversal;

pub use build::build_graph;
pub use dot::{load_dot, parse_dot, write_dot, DotError};
pub use stats::compute_statistics;
pub use traversal::{selection_subgraph, traverse_nodes, Direction};

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{KekError, Result};
use crate::kek::EntityKind;

/// Dense node index, stable for one graph instance.
pub type NodeId = usize;

/// Neighbour reference stored on both ends of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Adjacent {
    pub id: NodeId,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Owns,
    Operates,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Owns => "owns",
            EdgeKind::Operates => "operates",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owns" => Some(EdgeKind::Owns),
            "operates" => Some(EdgeKind::Operates),
            _ => None,
        }
    }
}

/// An entity in the graph together with its reach statistics.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub squuid: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub state: Option<String>,
    pub in_degree: usize,
    pub out_degree: usize,
    /// Distinct shareholders reachable upward.
    pub num_owners: usize,
    /// Sum of the effective shares of all upstream shareholders, as fractions.
    pub num_owners_weighted: f64,
    /// Distinct media reachable downward.
    pub num_medias: usize,
    /// Sum over reachable media of the strongest chain of shares.
    pub num_medias_weighted: f64,
    #[serde(skip)]
    pub nodes_in: Vec<Adjacent>,
    #[serde(skip)]
    pub nodes_out: Vec<Adjacent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

/// Directed, weighted ownership graph.
///
/// Squuids are unique and every edge references existing node ids.
#[derive(Debug, Clone, Default)]
pub struct OwnershipGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    by_squuid: HashMap<String, NodeId>,
}

impl OwnershipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, or return the id of the node that already has this squuid.
    pub fn add_node(&mut self, squuid: &str, label: &str, kind: EntityKind, state: Option<String>) -> NodeId {
        if let Some(&id) = self.by_squuid.get(squuid) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(GraphNode {
            id,
            squuid: squuid.to_string(),
            label: label.to_string(),
            kind,
            state,
            in_degree: 0,
            out_degree: 0,
            num_owners: 0,
            num_owners_weighted: 0.0,
            num_medias: 0,
            num_medias_weighted: 0.0,
            nodes_in: Vec::new(),
            nodes_out: Vec::new(),
        });
        self.by_squuid.insert(squuid.to_string(), id);
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: f64, kind: EdgeKind) -> Result<()> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return Err(KekError::InvalidInput(format!(
                "edge {} -> {} references a missing node",
                from, to
            )));
        }
        self.edges.push(GraphEdge { from, to, weight, kind });
        let source = &mut self.nodes[from];
        source.out_degree += 1;
        source.nodes_out.push(Adjacent { id: to, weight });
        let target = &mut self.nodes[to];
        target.in_degree += 1;
        target.nodes_in.push(Adjacent { id: from, weight });
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn node_by_squuid(&self, squuid: &str) -> Option<&GraphNode> {
        self.by_squuid.get(squuid).map(|&id| &self.nodes[id])
    }

    pub fn id_of(&self, squuid: &str) -> Option<NodeId> {
        self.by_squuid.get(squuid).copied()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [GraphNode] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_dedups_squuid() {
        let mut graph = OwnershipGraph::new();
        let a = graph.add_node("a", "A", EntityKind::Shareholder, None);
        let again = graph.add_node("a", "A2", EntityKind::Tv, None);
        assert_eq!(a, again);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(a).unwrap().label, "A");
    }

    #[test]
    fn test_add_edge_updates_adjacency() {
        let mut graph = OwnershipGraph::new();
        let a = graph.add_node("a", "A", EntityKind::Shareholder, None);
        let b = graph.add_node("b", "B", EntityKind::Radio, Some("Hessen".to_string()));
        graph.add_edge(a, b, 100.0, EdgeKind::Operates).unwrap();

        assert_eq!(graph.node(a).unwrap().out_degree, 1);
        assert_eq!(graph.node(b).unwrap().in_degree, 1);
        assert_eq!(graph.node(b).unwrap().nodes_in, vec![Adjacent { id: a, weight: 100.0 }]);
        assert_eq!(graph.node_by_squuid("b").unwrap().state.as_deref(), Some("Hessen"));
    }

    #[test]
    fn test_add_edge_rejects_missing_node() {
        let mut graph = OwnershipGraph::new();
        let a = graph.add_node("a", "A", EntityKind::Shareholder, None);
        assert!(graph.add_edge(a, 7, 1.0, EdgeKind::Owns).is_err());
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_node_serializes_type_field() {
        let mut graph = OwnershipGraph::new();
        graph.add_node("m", "M", EntityKind::Online, None);
        let json = serde_json::to_value(graph.node(0).unwrap()).unwrap();
        assert_eq!(json["type"], "online");
        assert!(json.get("nodes_in").is_none());
    }
}
