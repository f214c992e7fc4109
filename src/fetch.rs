//! Document fetching.
//!
//! The sync pipeline reads every page through the [`Fetcher`] trait, so
//! tests can serve fixture HTML and the CLI can use [`HttpFetcher`].
//! Failures are reported as [`SyncError::Fetch`] and are never retried
//! here; the freshness gate retries the target on the next run.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use tvgrid_core::error::SyncError;

/// Fetches a document's text by address.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, address: &str) -> Result<String, SyncError>;
}

/// HTTP fetcher backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("tvgrid/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn fetch_error(address: &str, e: impl std::fmt::Display) -> SyncError {
    SyncError::Fetch {
        address: address.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, address: &str) -> Result<String, SyncError> {
        tracing::debug!(address, "fetching");
        let resp = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| fetch_error(address, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_error(address, format!("HTTP {}", status)));
        }

        resp.text().await.map_err(|e| fetch_error(address, e))
    }
}
