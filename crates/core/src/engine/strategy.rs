//! The three request-time caching strategies.
//!
//! Only a status of exactly 200 is written back; other statuses pass through
//! uncached. Every strategy makes at most one network attempt.

use schemars::JsonSchema;
use serde::Serialize;

use super::CacheEngine;
use super::router::Route;
use crate::cache::RequestKey;
use crate::request::{Request, RequestMode, Response};
use crate::{Error, Fetcher};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

/// A response handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub route: Route,
    pub source: ResponseSource,
    pub response: Response,
}

impl Served {
    fn network(route: Route, response: Response) -> Self {
        Self { route, source: ResponseSource::Network, response }
    }

    fn cache(route: Route, response: Response) -> Self {
        Self { route, source: ResponseSource::Cache, response }
    }
}

impl<F: Fetcher> CacheEngine<F> {
    /// Network first with write-through on 200. On a rejected fetch, fall
    /// back to the cache; a miss there yields the absent result.
    pub(crate) async fn media_passthrough(&self, request: &Request) -> Option<Served> {
        let key = RequestKey::from(request);

        match self.fetcher.fetch(request, RequestMode::Cors).await {
            Ok(response) => {
                if response.status == 200 {
                    self.store(&key, &response).await;
                }
                Some(Served::network(Route::MediaPassthrough, response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "media fetch failed, trying cache");
                self.lookup(&key)
                    .await
                    .map(|response| Served::cache(Route::MediaPassthrough, response))
            }
        }
    }

    /// Cache first; on a miss, fetch and write back a 200. A rejected fetch
    /// propagates to the caller.
    pub(crate) async fn cache_first(&self, request: &Request) -> Result<Served, Error> {
        let key = RequestKey::from(request);

        if let Some(response) = self.lookup(&key).await {
            return Ok(Served::cache(Route::CacheFirst, response));
        }

        let response = self.fetcher.fetch(request, RequestMode::Cors).await?;
        if response.status == 200 {
            self.store(&key, &response).await;
        }

        Ok(Served::network(Route::CacheFirst, response))
    }

    /// Network first without write-back. On a rejected fetch, fall back to
    /// the cache; a miss there yields the absent result.
    pub(crate) async fn network_first(&self, request: &Request) -> Option<Served> {
        match self.fetcher.fetch(request, RequestMode::Cors).await {
            Ok(response) => Some(Served::network(Route::NetworkFirst, response)),
            Err(e) => {
                if e.is_network() {
                    tracing::debug!(url = %request.url, error = %e, "network failed, trying cache");
                } else {
                    tracing::warn!(url = %request.url, error = %e, "fetch failed, trying cache");
                }
                let key = RequestKey::from(request);
                self.lookup(&key)
                    .await
                    .map(|response| Served::cache(Route::NetworkFirst, response))
            }
        }
    }
}
