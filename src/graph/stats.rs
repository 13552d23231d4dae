//! Per-node reach statistics shown in the node table.

use std::collections::{HashMap, HashSet, VecDeque};

use super::traversal::{traverse_nodes, Direction};
use super::{NodeId, OwnershipGraph};

/// Improvements below this are treated as no change, so relaxation ends on cycles.
const EPSILON: f64 = 1e-12;

/// Edge weight as a fraction of ownership, capped at 1.
fn fraction(weight: f64) -> f64 {
    (weight / 100.0).clamp(0.0, 1.0)
}

/// Fill `num_owners*` and `num_medias*` for every node.
pub fn compute_statistics(graph: &mut OwnershipGraph) {
    let stats: Vec<(usize, f64, usize, f64)> = (0..graph.len())
        .map(|id| {
            let (num_owners, num_owners_weighted) = owner_stats(graph, id);
            let (num_medias, num_medias_weighted) = media_stats(graph, id);
            (num_owners, num_owners_weighted, num_medias, num_medias_weighted)
        })
        .collect();

    for (node, (owners, owners_w, medias, medias_w)) in graph.nodes_mut().iter_mut().zip(stats) {
        node.num_owners = owners;
        node.num_owners_weighted = owners_w;
        node.num_medias = medias;
        node.num_medias_weighted = medias_w;
    }
}

/// Distinct upstream shareholders and the sum of their effective shares.
///
/// Shares propagate up the chain; each edge is followed once.
fn owner_stats(graph: &OwnershipGraph, start: NodeId) -> (usize, f64) {
    let num_owners = traverse_nodes(graph, start, Direction::Up)
        .into_iter()
        .skip(1)
        .filter(|&id| !graph.nodes()[id].kind.is_media())
        .count();

    let mut open: HashMap<NodeId, f64> = HashMap::new();
    let mut pending: VecDeque<NodeId> = VecDeque::new();
    let mut done: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut total = 0.0;

    let push = |open: &mut HashMap<NodeId, f64>, pending: &mut VecDeque<NodeId>, id: NodeId, share: f64| {
        match open.get_mut(&id) {
            Some(value) => *value += share,
            None => {
                open.insert(id, share);
                pending.push_back(id);
            }
        }
    };

    for adj in &graph.nodes()[start].nodes_in {
        if done.insert((start, adj.id)) {
            push(&mut open, &mut pending, adj.id, fraction(adj.weight));
        }
    }

    while let Some(id) = pending.pop_front() {
        let Some(share) = open.remove(&id) else {
            continue;
        };
        if id != start && !graph.nodes()[id].kind.is_media() {
            total += share;
        }
        for adj in &graph.nodes()[id].nodes_in {
            if done.insert((id, adj.id)) {
                push(&mut open, &mut pending, adj.id, share * fraction(adj.weight));
            }
        }
    }

    (num_owners, total)
}

/// Distinct downstream media and the sum of the strongest share chain to each.
fn media_stats(graph: &OwnershipGraph, start: NodeId) -> (usize, f64) {
    let mut best: HashMap<NodeId, f64> = HashMap::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    best.insert(start, 1.0);
    queue.push_back(start);

    while let Some(id) = queue.pop_front() {
        let current = best[&id];
        for adj in &graph.nodes()[id].nodes_out {
            let candidate = current * fraction(adj.weight);
            let improved = match best.get(&adj.id) {
                Some(&known) => candidate > known + EPSILON,
                None => true,
            };
            if improved {
                best.insert(adj.id, candidate);
                queue.push_back(adj.id);
            }
        }
    }

    let mut count = 0;
    let mut weighted = 0.0;
    for (&id, &value) in &best {
        if id != start && graph.nodes()[id].kind.is_media() {
            count += 1;
            weighted += value;
        }
    }
    (count, weighted)
}
