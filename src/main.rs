//! keycache - demonstrations of typed storage, call history and page caching
//!
//! Connects to Redis and runs one of the `exercise`, `web` or `replay` commands.

use std::error::Error;
use std::process;
use std::sync::Arc;

use clap::Parser;

use keycache::cache::{replay, Cache, STORE_OPERATION};
use keycache::cli::{Action, Cli, RunConfig};
use keycache::store::{KeyValueStore, RedisStore};
use keycache::web::{HttpFetcher, WebCache, WebCacheConfig};

/// Flushes the database, checks two round-trips and replays the store history
async fn run_exercise(store: Arc<dyn KeyValueStore>) -> Result<(), Box<dyn Error>> {
    let cache = Cache::new(store.clone());
    cache.flush().await?;

    let text_key = cache.store("foo").await?;
    let int_key = cache.store(42).await?;

    let text = cache.get_str(&text_key).await?;
    if text.as_deref() != Some("foo") {
        return Err(format!("expected \"foo\" under {text_key}, got {text:?}").into());
    }
    let number = cache.get_int(&int_key).await?;
    if number != Some(42) {
        return Err(format!("expected 42 under {int_key}, got {number:?}").into());
    }
    println!("OK");

    replay(store.as_ref(), STORE_OPERATION).await?;
    Ok(())
}

/// Fetches `url` twice and shows the cached second result
async fn run_web(
    store: Arc<dyn KeyValueStore>,
    url: &str,
    config: WebCacheConfig,
) -> Result<(), Box<dyn Error>> {
    let web = WebCache::with_config(store, HttpFetcher::new(), config);

    web.get_page(url).await?;
    let cached = web.get_page(url).await?;
    println!("{cached}");
    println!("Access count: {}", web.access_count(url).await?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(RedisStore::connect(&config.store).await?);

    match config.action {
        Action::Exercise => run_exercise(store).await?,
        Action::Web { url, cache } => run_web(store, &url, cache).await?,
        Action::Replay { name } => {
            replay(store.as_ref(), &name).await?;
        }
    }

    Ok(())
}
