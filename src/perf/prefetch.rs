//! Resource prefetching
//!
//! [`prefetch_resources`] asks a [`ResourceHints`] implementation to load
//! every URL ahead of use and waits for all of them. The first failure wins:
//! the call fails immediately and the remaining hints are abandoned.

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use thiserror::Error;

/// Errors that can occur while prefetching
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrefetchError {
    /// A hint failed to load
    #[error("Prefetch of {url} failed: {reason}")]
    HintFailed { url: String, reason: String },
}

impl PrefetchError {
    /// URL of the failed hint
    pub fn url(&self) -> &str {
        match self {
            PrefetchError::HintFailed { url, .. } => url,
        }
    }
}

/// Platform mechanism for loading a resource ahead of use
#[async_trait]
pub trait ResourceHints: Send + Sync {
    /// Resolves once the resource has loaded
    async fn prefetch(&self, url: &str) -> Result<(), PrefetchError>;
}

/// Prefetches every URL concurrently
///
/// Resolves with one `()` per URL once all hints have loaded. Without a hint
/// capability, resolves immediately with an empty vector.
///
/// # Errors
///
/// Returns the first [`PrefetchError`] to occur; no partial results are
/// reported.
pub async fn prefetch_resources<S: AsRef<str>>(
    hints: Option<&dyn ResourceHints>,
    urls: &[S],
) -> Result<Vec<()>, PrefetchError> {
    let Some(hints) = hints else {
        return Ok(Vec::new());
    };

    try_join_all(urls.iter().map(|url| hints.prefetch(url.as_ref()))).await
}

/// Hint implementation that downloads the resource over HTTP
///
/// The response body is drained so that intermediate caches see a complete
/// transfer; its content is discarded.
#[derive(Debug, Clone, Default)]
pub struct HttpPrefetcher {
    client: Client,
}

impl HttpPrefetcher {
    /// Create a new prefetcher with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new prefetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHints for HttpPrefetcher {
    async fn prefetch(&self, url: &str) -> Result<(), PrefetchError> {
        let failed = |reason: String| PrefetchError::HintFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .header("Purpose", "prefetch")
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status.as_u16())));
        }

        while response
            .chunk()
            .await
            .map_err(|e| failed(e.to_string()))?
            .is_some()
        {}

        tracing::debug!(url = %url, "Prefetched resource");
        Ok(())
    }
}
