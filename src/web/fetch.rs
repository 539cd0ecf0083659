//! HTTP page fetcher
//!
//! This module provides the `PageFetcher` seam used by `WebCache` and its
//! production implementation over reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// Errors that can occur when fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Something that can retrieve the body of a URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// Fetches pages over HTTP with a plain GET
///
/// The body is returned for any status code; only transport failures are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a new HttpFetcher with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a new HttpFetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        log::debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let text = response.text().await?;
        Ok(text)
    }
}
