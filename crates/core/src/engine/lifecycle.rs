//! Install and activate transitions.
//!
//! Both are best-effort: a failing resource or generation is logged and
//! skipped, and the transition always completes with its host signal.

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::Serialize;

use super::{CacheEngine, WorkerState};
use crate::cache::{CacheHandle, RequestKey};
use crate::config::InstallKeying;
use crate::request::{Destination, Request, RequestMode};
use crate::{Error, Fetcher};

/// Query parameter appended to manifest fetches at install.
pub const CACHE_BUST_PARAM: &str = "v";

/// A manifest entry that could not be cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ResourceFailure {
    pub resource: String,
    pub error: String,
}

/// Outcome of an install transition.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    /// Keys (URLs) stored in the current generation.
    pub cached: Vec<String>,
    pub failed: Vec<ResourceFailure>,
    /// Always true once install has run: the worker asks to activate at once.
    pub skip_waiting: bool,
}

/// Outcome of an activate transition.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActivateReport {
    pub cache_name: String,
    /// Stale generations destroyed.
    pub deleted: Vec<String>,
    pub failed: Vec<ResourceFailure>,
    pub clients_claimed: bool,
}

impl<F: Fetcher> CacheEngine<F> {
    /// Pre-warm the current generation with the critical manifest, fetching
    /// every entry concurrently, then signal skip-waiting. An activated worker
    /// re-runs the pre-warm but stays activated.
    pub(crate) async fn install(&self) -> InstallReport {
        let reinstall = self.status().await.state == WorkerState::Activated;
        if !reinstall {
            self.set_state(WorkerState::Installing).await;
        }
        let cache_name = self.config.cache_name.clone();
        tracing::info!(cache = %cache_name, resources = self.config.critical_resources.len(), "caching critical resources");

        let mut cached = Vec::new();
        let mut failed = Vec::new();

        match self.current_cache().await {
            Ok(cache) => {
                let outcomes = join_all(
                    self.config
                        .critical_resources
                        .iter()
                        .map(|resource| self.install_resource(&cache, resource)),
                )
                .await;

                for (resource, outcome) in self.config.critical_resources.iter().zip(outcomes) {
                    match outcome {
                        Ok(url) => cached.push(url),
                        Err(e) => {
                            tracing::warn!(cache = %cache_name, resource = %resource, error = %e, "error caching resource");
                            failed.push(ResourceFailure { resource: resource.clone(), error: e.to_string() });
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(cache = %cache_name, error = %e, "error opening cache for install");
                failed.push(ResourceFailure { resource: cache_name.clone(), error: e.to_string() });
            }
        }

        {
            let mut status = self.lifecycle.write().await;
            if !reinstall {
                status.state = WorkerState::Installed;
            }
            status.skip_waiting = true;
        }
        tracing::info!(cache = %cache_name, cached = cached.len(), failed = failed.len(), "install complete, skipping wait");

        InstallReport { cache_name, cached, failed, skip_waiting: true }
    }

    /// Fetch one manifest entry with the cache-busting suffix and store it.
    /// Returns the URL it was stored under.
    async fn install_resource(&self, cache: &CacheHandle, resource: &str) -> Result<String, Error> {
        let request = Request::parse("GET", resource, Destination::Empty, Some(&self.origin))?;
        let busted = request.with_query_param(CACHE_BUST_PARAM, &self.bust_token);

        let response = self.fetcher.fetch(&busted, RequestMode::Cors).await?;
        if !response.ok() {
            return Err(Error::Network(format!("bad response status {} for {}", response.status, busted.url)));
        }

        let key = match self.config.install_keying {
            InstallKeying::CacheBusted => RequestKey::from(&busted),
            InstallKeying::Canonical => RequestKey::from(&request),
        };
        cache.put(&key, &response).await?;

        Ok(key.url)
    }

    /// Destroy every generation other than the current one, then signal
    /// claim-clients.
    pub(crate) async fn activate(&self) -> ActivateReport {
        self.set_state(WorkerState::Activating).await;
        let cache_name = self.config.cache_name.clone();

        let mut deleted = Vec::new();
        let mut failed = Vec::new();

        match self.cache.generation_names().await {
            Ok(names) => {
                let stale: Vec<String> = names.into_iter().filter(|name| *name != cache_name).collect();
                let outcomes = join_all(stale.iter().map(|name| {
                    tracing::info!(cache = %name, "deleting old cache");
                    self.cache.delete_generation(name)
                }))
                .await;

                for (name, outcome) in stale.into_iter().zip(outcomes) {
                    match outcome {
                        Ok(_) => deleted.push(name),
                        Err(e) => {
                            tracing::warn!(cache = %name, error = %e, "error deleting old cache");
                            failed.push(ResourceFailure { resource: name, error: e.to_string() });
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "error enumerating caches");
                failed.push(ResourceFailure { resource: cache_name.clone(), error: e.to_string() });
            }
        }

        {
            let mut status = self.lifecycle.write().await;
            status.state = WorkerState::Activated;
            status.clients_claimed = true;
        }
        tracing::info!(cache = %cache_name, deleted = deleted.len(), "activated, claiming clients");

        ActivateReport { cache_name, deleted, failed, clients_claimed: true }
    }
}
