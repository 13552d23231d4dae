//! Colors, icons and renderer options for the force-directed view.

use serde_json::{json, Value};

use crate::kek::EntityKind;

/// Background of the selected node in a subgraph view.
pub const SELECTED_COLOR: &str = "#bcb";

/// `(background, border)` per entity type
pub fn type_colors(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Shareholder => ("#777", "#ccc"),
        EntityKind::Radio => ("#986", "#dc9"),
        EntityKind::Online => ("#689", "#9cd"),
        EntityKind::Print => ("#698", "#9dc"),
        EntityKind::Tv => ("#965", "#da9"),
    }
}

/// Icon for a media type string; unknown types get a question mark.
pub fn type_icon(media_type: &str) -> &'static str {
    match media_type {
        "radio" => "📻",
        "online" => "🕸",
        "print" => "🕮",
        "tv" => "🖵",
        _ => "❓",
    }
}

/// Icon for a shareholder
pub fn shareholder_icon(natural_person: bool) -> &'static str {
    if natural_person {
        "😃"
    } else {
        "🏛"
    }
}

/// Options handed to the network renderer together with the data.
pub fn layout_options() -> Value {
    json!({
        "autoResize": true,
        "width": "100%",
        "height": "800px",
        "layout": {
            "improvedLayout": true,
            "randomSeed": 23
        },
        "nodes": {
            "shape": "dot",
            "font": {"color": "#ccc"}
        },
        "edges": {
            "arrows": "to",
            "arrowStrikethrough": false,
            "scaling": {"min": 2, "max": 10}
        },
        "physics": {
            "barnesHut": {},
            "stabilization": {"iterations": 300}
        }
    })
}
