pub mod config;
pub mod error;
pub mod graph;
pub mod kek;
pub mod network;
pub mod server;
pub mod view;

pub use config::Config;
pub use error::{KekError, Result};
pub use graph::{build_graph, OwnershipGraph};
pub use kek::{ApiClient, Kek, KekObject};
