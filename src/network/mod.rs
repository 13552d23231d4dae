//! Incremental network for the force-directed view.
//!
//! Each expansion step adds the nodes and edges around an entity to a
//! client's network, skipping everything already present, and reports only
//! the difference so the renderer can add it without re-layouting.

mod data;
mod session;
pub mod style;

pub use data::{to_vis_edges, to_vis_node, Delta, NetworkData, NodeColor, VisEdge, VisNode};
pub use session::NetworkSessions;
