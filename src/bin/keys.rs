use anyhow::Result;
use kekgraph::kek::{ApiClient, CachingMode, Kek};
use kekgraph::Config;

/// Dump all field names of media and shareholders in the cached archive.
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.log_level())
    ).init();

    let client = ApiClient::new(&config.archive)?;
    let kek = Kek::load(&client, CachingMode::Always, config.archive.concurrency).await?;

    let (media_keys, holder_keys) = kek.field_names();

    println!("media keys:");
    for key in &media_keys {
        println!("  {}", key);
    }

    println!("\nholder keys:");
    for key in &holder_keys {
        println!("  {}", key);
    }

    Ok(())
}
