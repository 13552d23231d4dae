use anyhow::{Context, Result};
use clap::Parser;
use kekgraph::graph::{build_graph, write_dot};
use kekgraph::kek::{ApiClient, CachingMode, Kek};
use kekgraph::Config;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "update")]
#[command(about = "Mirror the KEK archive into the data directory and write graph.dot")]
struct Args {
    /// Caching mode: always, never or upgrade (default from config.toml)
    #[arg(short, long)]
    caching: Option<CachingMode>,

    /// Maximum number of concurrent entity downloads
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let caching = args.caching.unwrap_or(config.archive.caching);
    let concurrency = args.concurrency.unwrap_or(config.archive.concurrency);
    log::info!("Updating {} (caching: {:?})", config.data_dir().display(), caching);

    let start = Instant::now();
    let client = ApiClient::new(&config.archive)?;
    let kek = Kek::load(&client, caching, concurrency).await?;
    println!("{} media", kek.medias().len());
    println!("{} shareholders", kek.holders().len());

    let graph = build_graph(&kek);
    let graph_path = config.graph_path();
    println!("writing {}", graph_path.display());

    let text = format!(
        "// kekgraph {} at {}\n{}",
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().to_rfc3339(),
        write_dot(&graph)
    );
    std::fs::write(&graph_path, text)
        .with_context(|| format!("Failed to write {}", graph_path.display()))?;

    log::info!(
        "Update finished in {:.1}s: {} nodes, {} edges",
        start.elapsed().as_secs_f64(),
        graph.len(),
        graph.edges().len()
    );
    Ok(())
}
