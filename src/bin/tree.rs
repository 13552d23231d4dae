use anyhow::{anyhow, Result};
use clap::Parser;
use kekgraph::kek::{ApiClient, CachingMode, Kek, TreeDirection};
use kekgraph::Config;

#[derive(Parser, Debug)]
#[command(name = "tree")]
#[command(about = "Print the ownership tree above or below an entity")]
struct Args {
    /// Squuid, or a name pattern like "Axel Springer*"
    entity: String,

    /// up (owners and operators) or down (holdings and media)
    #[arg(short, long, default_value = "up")]
    direction: TreeDirection,
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

    print!("{}", kek.dump_tree(object, args.direction));
    Ok(())
}
