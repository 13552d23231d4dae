//! Derive the ownership graph from the loaded archive.

use super::{compute_statistics, EdgeKind, OwnershipGraph};
use crate::kek::{EntityKind, Kek, KekObject};

/// Weight of an `operates` edge; operators fully control their media.
const OPERATES_WEIGHT: f64 = 100.0;

/// Build the graph: every shareholder with its holdings and operated media,
/// followed by media that no shareholder operates.
pub fn build_graph(kek: &Kek) -> OwnershipGraph {
    let mut graph = OwnershipGraph::new();

    for holder in kek.holders() {
        let from = add_object(&mut graph, holder);

        for owned in holder.owns() {
            let Some(target) = kek.get(&owned.squuid) else {
                log::warn!("{} owns unknown entity {}", holder.squuid(), owned.squuid);
                continue;
            };
            let to = add_object(&mut graph, target);
            let weight = owned.shares.unwrap_or(0.0).max(1.0);
            if let Err(e) = graph.add_edge(from, to, weight, EdgeKind::Owns) {
                log::warn!("skipping edge: {}", e);
            }
        }

        for operated in holder.operates() {
            let Some(target) = kek.get(&operated.squuid) else {
                log::warn!("{} operates unknown entity {}", holder.squuid(), operated.squuid);
                continue;
            };
            let to = add_object(&mut graph, target);
            if let Err(e) = graph.add_edge(from, to, OPERATES_WEIGHT, EdgeKind::Operates) {
                log::warn!("skipping edge: {}", e);
            }
        }
    }

    for media in kek.medias() {
        add_object(&mut graph, media);
    }

    compute_statistics(&mut graph);
    log::info!("graph: {} nodes, {} edges", graph.len(), graph.edges().len());
    graph
}

fn add_object(graph: &mut OwnershipGraph, object: &KekObject) -> usize {
    let kind = if object.is_media() {
        object.kind()
    } else {
        EntityKind::Shareholder
    };
    graph.add_node(
        object.squuid(),
        object.name(),
        kind,
        object.state().map(str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kek::sample_kek;
    use serde_json::json;

    #[test]
    fn test_build_from_archive() {
        let kek = sample_kek();
        let graph = build_graph(&kek);
        assert_eq!(graph.len(), 7);
        assert_eq!(graph.edges().len(), 6);

        let radio = graph.node_by_squuid("m-radio").unwrap();
        assert_eq!(radio.kind, EntityKind::Radio);
        assert_eq!(radio.state.as_deref(), Some("Berlin"));
        assert_eq!(radio.in_degree, 1);

        let hold = graph.node_by_squuid("h-hold").unwrap();
        assert_eq!(hold.out_degree, 2);
        assert_eq!(hold.num_medias, 2);

        let operates: Vec<_> = graph
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Operates)
            .collect();
        assert_eq!(operates.len(), 2);
        assert!(operates.iter().all(|e| e.weight == 100.0));
    }

    #[test]
    fn test_small_shares_clamped_to_one() {
        let obj = |v| KekObject::new(v).unwrap();
        let kek = Kek::from_objects(
            vec![],
            vec![
                obj(json!({"squuid": "a", "name": "A",
                    "owns": [{"held": {"squuid": "b", "name": "B"}, "capitalShares": 0.2},
                             {"held": {"squuid": "ghost", "name": "Ghost"}, "capitalShares": 10}]})),
                obj(json!({"squuid": "b", "name": "B"})),
            ],
        );
        let graph = build_graph(&kek);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].weight, 1.0);
    }

    #[test]
    fn test_unoperated_media_included() {
        let obj = |v| KekObject::new(v).unwrap();
        let kek = Kek::from_objects(
            vec![obj(json!({"squuid": "m", "name": "Lonely TV", "type": "tv", "operatedBy": []}))],
            vec![],
        );
        let graph = build_graph(&kek);
        assert_eq!(graph.node_by_squuid("m").unwrap().kind, EntityKind::Tv);
    }
}
