use anyhow::{anyhow, Result};
use clap::Parser;
use kekgraph::kek::{ApiClient, CachingMode, Kek};
use kekgraph::Config;

#[derive(Parser, Debug)]
#[command(name = "owners")]
#[command(about = "List the effective top owners of an entity")]
struct Args {
    /// Squuid, or a name pattern like "*Zeitung*"
    entity: String,

    /// Only show owners with at least this share in percent
    #[arg(short, long, default_value_t = 0.0)]
    min_percent: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let client = ApiClient::new(&config.archive)?;
    let kek = Kek::load(&client, CachingMode::Always, config.archive.concurrency).await?;

    let object = kek
        .resolve(&args.entity)?
        .ok_or_else(|| anyhow!("No media or shareholder matches '{}'", args.entity))?;

    println!("top owners of {} ({})\n", object.name(), object.squuid());
    let owners = kek.top_owners(object);
    if owners.is_empty() {
        println!("no known owners");
        return Ok(());
    }
    for owner in owners.iter().filter(|o| o.percent >= args.min_percent) {
        println!("{:>9.3}%  {}  ({})", owner.percent, owner.name, owner.squuid);
    }
    Ok(())
}
