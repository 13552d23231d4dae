use anyhow::{Context, Result};
use kekgraph::graph::load_dot;
use kekgraph::kek::Collection;
use kekgraph::server::ViewerServer;
use kekgraph::Config;
use std::collections::HashSet;
use walkdir::WalkDir;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => {
            run_server(config).await?;
        }
        "verify" | _ => {
            run_verification(&config)?;
        }
    }

    Ok(())
}

/// Serve the viewer backend from the data directory
async fn run_server(config: Config) -> Result<()> {
    let graph_path = config.graph_path();
    let graph = load_dot(&graph_path).with_context(|| {
        format!(
            "Failed to load {}. Run `update` to download the archive and write the graph.",
            graph_path.display()
        )
    })?;

    let server = ViewerServer::new(config, graph);
    server.run().await?;
    Ok(())
}

/// Check that the data directory holds a consistent archive
fn run_verification(config: &Config) -> Result<()> {
    log::info!("Starting kekgraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Data directory: {}", config.data_dir().display());
    log::info!("API: {}", config.archive.api_url);

    if !config.data_dir().is_dir() {
        anyhow::bail!(
            "Data directory {} does not exist. Run `update` first.",
            config.data_dir().display()
        );
    }

    let mut cached: HashSet<String> = HashSet::new();
    for collection in [Collection::Media, Collection::Shareholders] {
        let list_file = config.data_dir().join(format!("{}.json", collection.name()));
        if !list_file.is_file() {
            log::warn!("Missing list file {}", list_file.display());
        }

        let dir = config.data_dir().join(collection.name());
        let mut count = 0;
        for entry in WalkDir::new(&dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    cached.insert(stem.to_string());
                    count += 1;
                }
            }
        }
        log::info!("{}: {} cached records", collection.name(), count);
    }

    let graph = load_dot(&config.graph_path())
        .with_context(|| format!("Failed to load {}", config.graph_path().display()))?;

    let missing: Vec<&str> = graph
        .nodes()
        .iter()
        .map(|node| node.squuid.as_str())
        .filter(|squuid| !cached.contains(*squuid))
        .collect();
    if missing.is_empty() {
        log::info!("✓ Every graph node has a cached record");
    } else {
        log::warn!(
            "{} of {} graph nodes have no cached record, e.g. {}",
            missing.len(),
            graph.len(),
            missing[0]
        );
    }

    log::info!("Ready to serve on port {}", config.http_server.port);
    Ok(())
}
