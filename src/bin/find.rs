use anyhow::Result;
use clap::Parser;
use kekgraph::kek::{parse_filters, ApiClient, CachingMode, Kek};
use kekgraph::Config;

#[derive(Parser, Debug)]
#[command(name = "find")]
#[command(about = "Find media or shareholders by field patterns")]
struct Args {
    /// Filters as field=pattern, e.g. type=radio "name=*Welle*"
    #[arg(required = true)]
    filters: Vec<String>,

    /// Search shareholders instead of media
    #[arg(long)]
    holders: bool,

    /// Maximum number of results
    #[arg(short, long, default_value_t = 50)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let filters = parse_filters(&args.filters)?;
    let client = ApiClient::new(&config.archive)?;
    let kek = Kek::load(&client, CachingMode::Always, config.archive.concurrency).await?;

    let results: Vec<_> = if args.holders {
        kek.filter_holder(&filters).collect()
    } else {
        kek.filter_media(&filters).collect()
    };

    for object in results.iter().take(args.limit) {
        println!("{}  {:<12} {}", object.squuid(), object.kind(), object.name());
    }
    if results.len() > args.limit {
        println!("... {} more", results.len() - args.limit);
    }
    println!("\n{} found", results.len());
    Ok(())
}
