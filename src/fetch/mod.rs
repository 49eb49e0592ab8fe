//! Fetching of gateway status documents.

mod http;

pub use http::*;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Fetch error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Retrieves the body behind a URL.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Fetch with random jitter and an overall timeout.
pub async fn fetch_with_timeout<F: Fetcher>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    // Add jitter so every instance is not hit in the same instant
    let jitter = rand::random::<u64>() % 100;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}
