//! Background video preload, run on the connectivity-restored signal.

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::Serialize;

use super::CacheEngine;
use crate::cache::RequestKey;
use crate::request::{Destination, Request, RequestMode};
use crate::{Error, Fetcher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct AssetFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of one preload run. The run itself never fails.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PreloadReport {
    pub tag: String,
    pub stored: Vec<String>,
    /// Fetched, but neither OK nor opaque, so not stored.
    pub skipped: Vec<String>,
    pub failed: Vec<AssetFailure>,
}

enum AssetOutcome {
    Stored,
    Skipped,
}

impl<F: Fetcher> CacheEngine<F> {
    /// Fetch every preload asset concurrently in no-cors mode and store each
    /// OK or opaque response, keyed by the asset URL. Resolves once every
    /// fetch has settled.
    pub(crate) async fn preload_videos(&self) -> PreloadReport {
        let urls = self.config.preload_urls();
        tracing::debug!(assets = urls.len(), "starting background video preload");

        let outcomes = join_all(urls.iter().map(|url| self.preload_asset(url))).await;

        let mut report = PreloadReport {
            tag: self.config.preload_tag.clone(),
            stored: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };

        for (url, outcome) in urls.into_iter().zip(outcomes) {
            match outcome {
                Ok(AssetOutcome::Stored) => report.stored.push(url),
                Ok(AssetOutcome::Skipped) => report.skipped.push(url),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "background video preload failed");
                    report.failed.push(AssetFailure { url, error: e.to_string() });
                }
            }
        }

        report
    }

    async fn preload_asset(&self, url: &str) -> Result<AssetOutcome, Error> {
        let request = Request::parse("GET", url, Destination::Video, None)?;
        let response = self.fetcher.fetch(&request, RequestMode::NoCors).await?;

        if !(response.ok() || response.is_opaque()) {
            tracing::debug!(url, status = response.status, "preload response not cacheable");
            return Ok(AssetOutcome::Skipped);
        }

        let key = RequestKey::for_url(url, None)?;
        self.current_cache().await?.put(&key, &response).await?;

        Ok(AssetOutcome::Stored)
    }
}
