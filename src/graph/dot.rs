//! Reading and writing the `graph.dot` file served to the viewer.

use petgraph::dot::dot_parser::{DotAttrList, DotNodeWeight, ParseFromDot};
use petgraph::dot::{Config, Dot};
use petgraph::stable_graph::{StableDiGraph, StableGraph};
use petgraph::visit::EdgeRef;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use super::{compute_statistics, EdgeKind, GraphEdge, GraphNode, OwnershipGraph};
use crate::kek::EntityKind;

/// Characters of source shown before the error position.
const CONTEXT_BEFORE: usize = 20;
/// Length of the source snippet in error messages.
const CONTEXT_LEN: usize = 100;

/// Parse failure with the character offset it happened at.
#[derive(Debug, Clone, PartialEq)]
pub struct DotError {
    pub message: String,
    pub position: usize,
    snippet: Option<String>,
}

impl DotError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            snippet: None,
        }
    }

    /// Attach the part of `source` around the error position.
    pub fn with_context(mut self, source: &str) -> Self {
        let start = self.position.saturating_sub(CONTEXT_BEFORE);
        self.snippet = Some(source.chars().skip(start).take(CONTEXT_LEN).collect());
        self
    }
}

impl std::fmt::Display for DotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error parsing dot: {} (char {})", self.message, self.position)?;
        if let Some(snippet) = &self.snippet {
            write!(f, " at: {}", snippet)?;
        }
        Ok(())
    }
}

impl std::error::Error for DotError {}

/// Serialize the graph, one statement per node and per edge.
pub fn write_dot(graph: &OwnershipGraph) -> String {
    // Nodes are added in id order, so petgraph indices equal node ids.
    let mut dot_graph: StableDiGraph<&GraphNode, &GraphEdge> = StableDiGraph::new();
    let indices: Vec<_> = graph.nodes().iter().map(|node| dot_graph.add_node(node)).collect();
    for edge in graph.edges() {
        dot_graph.add_edge(indices[edge.from], indices[edge.to], edge);
    }

    format!(
        "{:?}",
        Dot::with_attr_getters(
            &dot_graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, edge| edge_attributes(edge.weight()),
            &|_, (_, node)| node_attributes(node),
        )
    )
}

fn node_attributes(node: &GraphNode) -> String {
    let mut attrs = format!(
        "name={}, label={}, type={}",
        quote(&node.squuid),
        quote(&node.label),
        node.kind.as_str()
    );
    if let Some(state) = &node.state {
        attrs.push_str(&format!(", state={}", quote(state)));
    }
    attrs.push_str(&format!(
        ", in_degree={}, out_degree={}, num_owners={}, num_owners_weighted={}, num_medias={}, num_medias_weighted={} ",
        node.in_degree,
        node.out_degree,
        node.num_owners,
        node.num_owners_weighted,
        node.num_medias,
        node.num_medias_weighted,
    ));
    attrs
}

fn edge_attributes(edge: &GraphEdge) -> String {
    format!("weight={}, type={} ", edge.weight, edge.kind.as_str())
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Inverse of [`quote`]; bare ids are returned as they are.
fn unquote(s: &str) -> String {
    let Some(inner) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            // line continuation
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse a dot document into an ownership graph.
///
/// Node `name` attributes carry squuids; nodes only mentioned in edges are
/// created on the fly. Numeric dot ids keep their order, other ids follow
/// sorted. Statistics are taken from the attributes when every node has
/// them, otherwise recomputed.
pub fn parse_dot(source: &str) -> Result<OwnershipGraph, DotError> {
    let parsed: StableGraph<DotNodeWeight<'_>, DotAttrList<'_>> =
        ParseFromDot::try_from(source).map_err(|e| parse_error(source, &e.to_string()))?;

    let mut dot_nodes: Vec<(String, HashMap<String, String>, _)> = parsed
        .node_indices()
        .map(|index| {
            let node = &parsed[index];
            let attrs = node
                .attr
                .elems
                .iter()
                .map(|(key, value)| (unquote(key), unquote(value)))
                .collect();
            (unquote(&node.id), attrs, index)
        })
        .collect();
    dot_nodes.sort_by(|(a, ..), (b, ..)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });

    let mut graph = OwnershipGraph::new();
    let mut ids = HashMap::with_capacity(dot_nodes.len());
    for (dot_id, attrs, index) in &dot_nodes {
        let squuid = attrs.get("name").unwrap_or(dot_id);
        let label = attrs.get("label").unwrap_or(squuid);
        let kind = attrs
            .get("type")
            .and_then(|t| EntityKind::parse(t))
            .unwrap_or(EntityKind::Shareholder);
        ids.insert(*index, graph.add_node(squuid, label, kind, attrs.get("state").cloned()));
    }

    for edge in parsed.edge_indices() {
        let Some((source, target)) = parsed.edge_endpoints(edge) else {
            continue;
        };
        let (Some(&from), Some(&to)) = (ids.get(&source), ids.get(&target)) else {
            continue;
        };
        let attrs: HashMap<String, String> = parsed[edge]
            .elems
            .iter()
            .map(|(key, value)| (unquote(key), unquote(value)))
            .collect();
        let weight = attrs.get("weight").and_then(|w| w.parse::<f64>().ok()).unwrap_or(1.0);
        let kind = attrs.get("type").and_then(|t| EdgeKind::parse(t)).unwrap_or_else(|| {
            let target_is_media = graph.node(to).map(|n| n.kind.is_media()).unwrap_or(false);
            if target_is_media {
                EdgeKind::Operates
            } else {
                EdgeKind::Owns
            }
        });
        // ids come from add_node, so this cannot fail
        let _ = graph.add_edge(from, to, weight, kind);
    }

    let stats: Option<Vec<_>> = dot_nodes
        .iter()
        .map(|(_, attrs, index)| {
            Some((
                ids[index],
                attrs.get("num_owners")?.parse::<usize>().ok()?,
                attrs.get("num_owners_weighted")?.parse::<f64>().ok()?,
                attrs.get("num_medias")?.parse::<usize>().ok()?,
                attrs.get("num_medias_weighted")?.parse::<f64>().ok()?,
            ))
        })
        .collect();

    match stats {
        Some(stats) if !stats.is_empty() => {
            let nodes = graph.nodes_mut();
            for (id, owners, owners_w, medias, medias_w) in stats {
                let node = &mut nodes[id];
                node.num_owners = owners;
                node.num_owners_weighted = owners_w;
                node.num_medias = medias;
                node.num_medias_weighted = medias_w;
            }
        }
        _ => compute_statistics(&mut graph),
    }

    Ok(graph)
}

/// Turn the parser's `line:col` report into a character offset.
fn parse_error(source: &str, report: &str) -> DotError {
    static LOCATION: OnceLock<Option<Regex>> = OnceLock::new();
    let location = LOCATION.get_or_init(|| Regex::new(r"-->\s*(\d+):(\d+)").ok());

    let position = location
        .as_ref()
        .and_then(|re| re.captures(report))
        .and_then(|caps| Some((caps[1].parse::<usize>().ok()?, caps[2].parse::<usize>().ok()?)))
        .map(|(line, col)| {
            let before: usize = source
                .split('\n')
                .take(line.saturating_sub(1))
                .map(|l| l.chars().count() + 1)
                .sum();
            before + col.saturating_sub(1)
        })
        .unwrap_or(0);

    let message = report
        .lines()
        .find_map(|l| l.trim().strip_prefix("= "))
        .or_else(|| report.lines().next())
        .unwrap_or("invalid dot")
        .trim()
        .to_string();

    DotError::new(message, position).with_context(source)
}

/// Read and parse a dot file.
pub fn load_dot(path: &Path) -> crate::error::Result<OwnershipGraph> {
    let source = std::fs::read_to_string(path)?;
    let graph = parse_dot(&source)?;
    log::info!(
        "loaded {}: {} nodes, {} edges",
        path.display(),
        graph.len(),
        graph.edges().len()
    );
    Ok(graph)
}
