use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::style::{type_colors, SELECTED_COLOR};
use crate::error::{KekError, Result};
use crate::graph::{selection_subgraph, GraphNode, NodeId, OwnershipGraph};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeColor {
    pub background: String,
    pub border: String,
    pub highlight: String,
}

/// Node as consumed by the network renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisNode {
    pub id: NodeId,
    pub label: String,
    pub group: String,
    pub color: NodeColor,
    /// Node size; the weighted number of reachable media
    pub value: f64,
}

/// Edge as consumed by the network renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub value: f64,
    pub label: String,
    pub color: String,
}

/// Changes after an expansion step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Delta {
    pub nodes: Vec<VisNode>,
    pub edges: Vec<VisEdge>,
    /// Nodes already shown whose color changed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updated: Vec<VisNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Vec<NodeId>>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.updated.is_empty()
    }
}

pub fn to_vis_node(node: &GraphNode) -> VisNode {
    let (background, border) = type_colors(node.kind);
    VisNode {
        id: node.id,
        label: node.label.clone(),
        group: node.kind.as_str().to_string(),
        color: NodeColor {
            background: background.to_string(),
            border: border.to_string(),
            highlight: border.to_string(),
        },
        value: node.num_medias_weighted,
    }
}

/// All incoming and outgoing edges of `node`.
///
/// Outgoing edges take the node's color, incoming ones the other end's.
pub fn to_vis_edges(graph: &OwnershipGraph, node: &GraphNode) -> Vec<VisEdge> {
    let own_color = type_colors(node.kind).0;
    let outgoing = node.nodes_out.iter().map(|other| VisEdge {
        from: node.id,
        to: other.id,
        value: other.weight,
        label: format_weight(other.weight),
        color: own_color.to_string(),
    });
    let incoming = node.nodes_in.iter().map(|other| {
        let color = graph
            .node(other.id)
            .map(|n| type_colors(n.kind).0)
            .unwrap_or(own_color);
        VisEdge {
            from: other.id,
            to: node.id,
            value: other.weight,
            label: format_weight(other.weight),
            color: color.to_string(),
        }
    });
    outgoing.chain(incoming).collect()
}

fn mark_selected(vis: &mut VisNode) {
    vis.color.background = SELECTED_COLOR.to_string();
    vis.color.highlight = SELECTED_COLOR.to_string();
}

fn is_marked(vis: &VisNode) -> bool {
    vis.color.background == SELECTED_COLOR
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{}", weight as i64)
    } else {
        format!("{}", weight)
    }
}

/// Network shown to one client, grown by repeated expansions.
///
/// Nodes are unique by id and edges by `(from, to)`; adding something twice
/// is a no-op.
#[derive(Debug, Default, Clone, Serialize)]
pub struct NetworkData {
    nodes: Vec<VisNode>,
    edges: Vec<VisEdge>,
    selection: Vec<NodeId>,
    #[serde(skip)]
    existing_nodes: HashSet<NodeId>,
    #[serde(skip)]
    existing_edges: HashMap<NodeId, HashSet<NodeId>>,
}

impl NetworkData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[VisNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[VisEdge] {
        &self.edges
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.existing_nodes.contains(&id)
    }

    pub fn contains_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.existing_edges
            .get(&from)
            .map(|targets| targets.contains(&to))
            .unwrap_or(false)
    }

    /// Insert what is new and return exactly that.
    pub fn add(&mut self, nodes: Vec<VisNode>, edges: Vec<VisEdge>) -> Delta {
        let mut delta = Delta::default();

        for node in nodes {
            if self.existing_nodes.insert(node.id) {
                self.nodes.push(node.clone());
                delta.nodes.push(node);
            }
        }
        for edge in edges {
            if self.existing_edges.entry(edge.from).or_default().insert(edge.to) {
                self.edges.push(edge.clone());
                delta.edges.push(edge);
            }
        }

        delta
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.selection.clear();
        self.existing_nodes.clear();
        self.existing_edges.clear();
    }

    pub fn set_selection(&mut self, selection: Vec<NodeId>) {
        self.selection = selection;
    }

    /// Expand around one entity: the entity, its direct neighbours and
    /// every edge touching it.
    pub fn select(&mut self, graph: &OwnershipGraph, squuid: &str) -> Result<Delta> {
        let node = graph
            .node_by_squuid(squuid)
            .ok_or_else(|| KekError::NotFound(format!("entity {}", squuid)))?;

        let edges = to_vis_edges(graph, node);
        let mut nodes = vec![to_vis_node(node)];
        for edge in &edges {
            for id in [edge.from, edge.to] {
                if let Some(other) = graph.node(id) {
                    nodes.push(to_vis_node(other));
                }
            }
        }

        let mut delta = self.add(nodes, edges);
        self.set_selection(vec![node.id]);
        delta.selection = Some(vec![node.id]);
        log::debug!(
            "select {}: +{} nodes, +{} edges",
            squuid,
            delta.nodes.len(),
            delta.edges.len()
        );
        Ok(delta)
    }

    /// Show everything above and below one entity, the entity highlighted.
    ///
    /// Only edges between shown nodes are added.
    pub fn show_subgraph(&mut self, graph: &OwnershipGraph, squuid: &str) -> Result<Delta> {
        let selected = graph
            .id_of(squuid)
            .ok_or_else(|| KekError::NotFound(format!("entity {}", squuid)))?;

        let picked = selection_subgraph(graph, selected);
        let picked_set: HashSet<NodeId> = picked.iter().copied().collect();

        let mut nodes = Vec::with_capacity(picked.len());
        let mut edges = Vec::new();
        for id in picked {
            let Some(entry) = graph.node(id) else {
                continue;
            };
            let mut vis = to_vis_node(entry);
            if id == selected {
                mark_selected(&mut vis);
            }
            nodes.push(vis);

            let color = type_colors(entry.kind).0;
            for other in entry.nodes_out.iter().filter(|o| picked_set.contains(&o.id)) {
                edges.push(VisEdge {
                    from: entry.id,
                    to: other.id,
                    value: other.weight,
                    label: format_weight(other.weight),
                    color: color.to_string(),
                });
            }
        }
        log::debug!("subgraph of {}: {} nodes", squuid, nodes.len());

        let mut delta = self.add(nodes, edges);
        delta.updated = self.move_highlight(graph, selected);
        self.set_selection(vec![selected]);
        delta.selection = Some(vec![selected]);
        Ok(delta)
    }

    /// Highlight `selected` and give any previously highlighted node its
    /// type color back. Returns the nodes that changed.
    fn move_highlight(&mut self, graph: &OwnershipGraph, selected: NodeId) -> Vec<VisNode> {
        let mut updated = Vec::new();
        for vis in &mut self.nodes {
            if vis.id == selected {
                if !is_marked(vis) {
                    mark_selected(vis);
                    updated.push(vis.clone());
                }
            } else if is_marked(vis) {
                if let Some(node) = graph.node(vis.id) {
                    vis.color = to_vis_node(node).color;
                    updated.push(vis.clone());
                }
            }
        }
        updated
    }
}
