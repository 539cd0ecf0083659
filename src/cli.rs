//! Command-line interface parsing for keycache
//!
//! This module handles parsing of CLI arguments using clap and turns them into a
//! validated `RunConfig` before any store connection is made.

use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Url;
use thiserror::Error;

use crate::store::{StoreConfig, DEFAULT_REDIS_URL};
use crate::web::WebCacheConfig;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The page URL could not be parsed or is not http(s)
    #[error("Invalid URL: '{0}'. Expected an absolute http:// or https:// URL")]
    InvalidUrl(String),

    /// The TTL must be at least one second
    #[error("Invalid TTL: {0}. The cache TTL must be at least 1 second")]
    InvalidTtl(u64),
}

/// keycache - typed value storage, call history and a page cache on Redis
#[derive(Parser, Debug)]
#[command(name = "keycache")]
#[command(about = "Typed value storage, call history and a page cache on Redis")]
#[command(version)]
pub struct Cli {
    /// Redis connection URL
    #[arg(long, global = true, default_value = DEFAULT_REDIS_URL, value_name = "URL")]
    pub redis_url: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Flush the database, store and read back sample values, then replay Cache.store
    Exercise,

    /// Fetch a page twice through the cache and print the access count
    ///
    /// Examples:
    ///   keycache web https://example.com
    ///   keycache web https://example.com --ttl 30
    Web {
        /// Page to fetch
        url: String,

        /// Seconds a fetched page stays cached
        #[arg(long, default_value_t = 10, value_name = "SECONDS")]
        ttl: u64,
    },

    /// Print the recorded calls of an instrumented operation
    Replay {
        /// Qualified operation name, e.g. Cache.store
        #[arg(default_value = crate::cache::STORE_OPERATION)]
        name: String,
    },
}

/// What the binary should do, with validated settings
#[derive(Debug, Clone)]
pub enum Action {
    Exercise,
    Web { url: String, cache: WebCacheConfig },
    Replay { name: String },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub store: StoreConfig,
    pub action: Action,
}

/// Validates a page URL argument
///
/// # Returns
/// * `Ok(())` for absolute http/https URLs
/// * `Err(CliError::InvalidUrl)` otherwise
pub fn parse_url_arg(s: &str) -> Result<(), CliError> {
    match Url::parse(s) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(CliError::InvalidUrl(s.to_string())),
    }
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with appropriate settings
    /// * `Err(CliError)` if the URL or TTL is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let store = StoreConfig {
            url: cli.redis_url.clone(),
        };

        let action = match &cli.command {
            Command::Exercise => Action::Exercise,
            Command::Web { url, ttl } => {
                parse_url_arg(url)?;
                if *ttl == 0 {
                    return Err(CliError::InvalidTtl(*ttl));
                }
                Action::Web {
                    url: url.clone(),
                    cache: WebCacheConfig {
                        ttl: Duration::from_secs(*ttl),
                    },
                }
            }
            Command::Replay { name } => Action::Replay { name: name.clone() },
        };

        Ok(RunConfig { store, action })
    }
}
