//! The caching policy engine.
//!
//! The host delivers four events through [`ServiceWorker`]: install, activate,
//! intercepted requests and deferred-task signals. Each returns a future the
//! host awaits; it resolves only once every cache write the event started has
//! settled.
//!
//! - [`router`]: classifies a request into one of three routes
//! - [`strategy`]: media passthrough, image cache-first, generic network-first
//! - [`lifecycle`]: install pre-warm and stale-generation eviction
//! - [`preload`]: background video preload on the connectivity signal

pub mod lifecycle;
pub mod preload;
pub mod router;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use crate::cache::{CacheDb, CacheHandle, RequestKey};
use crate::config::AppConfig;
use crate::request::{Request, Response, canonicalize};
use crate::{Error, Fetcher};

pub use lifecycle::{ActivateReport, InstallReport, ResourceFailure};
pub use preload::{AssetFailure, PreloadReport};
pub use router::{Route, classify};
pub use strategy::{ResponseSource, Served};

/// Events the host platform delivers to the engine.
#[async_trait]
pub trait ServiceWorker: Send + Sync {
    /// Pre-warm the current generation, then signal skip-waiting.
    async fn on_install(&self) -> InstallReport;

    /// Evict stale generations, then signal claim-clients.
    async fn on_activate(&self) -> ActivateReport;

    /// Answer an intercepted request. `Ok(None)` is the absent result: every
    /// fallback was exhausted and no response exists.
    async fn on_intercept(&self, request: Request) -> Result<Option<Served>, Error>;

    /// Deferred-task signal. Returns None when `tag` names no known task.
    async fn on_deferred_task(&self, tag: &str) -> Option<PreloadReport>;
}

/// Worker lifecycle position as seen by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

/// Lifecycle position plus the signals sent to the host so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct LifecycleStatus {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

/// Caching policy engine over a SQLite cache store and a network primitive.
pub struct CacheEngine<F> {
    config: AppConfig,
    origin: Url,
    cdn_base: String,
    bust_token: String,
    cache: CacheDb,
    fetcher: F,
    lifecycle: RwLock<LifecycleStatus>,
}

impl<F: Fetcher> CacheEngine<F> {
    /// Build an engine. The cache-busting token is taken from the config or
    /// stamped from the clock, once, here.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if `origin` or `cdn_base` does not parse.
    pub fn new(config: AppConfig, cache: CacheDb, fetcher: F) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let cdn_base = canonicalize(&config.cdn_base, None)?.to_string();
        let bust_token = config
            .cache_bust_token
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

        Ok(Self {
            config,
            origin,
            cdn_base,
            bust_token,
            cache,
            fetcher,
            lifecycle: RwLock::new(LifecycleStatus::default()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Scope URL relative requests resolve against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn bust_token(&self) -> &str {
        &self.bust_token
    }

    /// Canonical CDN base used for media routing.
    pub fn cdn_base(&self) -> &str {
        &self.cdn_base
    }

    /// Route `request` would take if intercepted.
    pub fn route(&self, request: &Request) -> Route {
        classify(request, &self.cdn_base)
    }

    pub async fn status(&self) -> LifecycleStatus {
        *self.lifecycle.read().await
    }

    /// Handle on the current generation, created if absent.
    pub async fn current_cache(&self) -> Result<CacheHandle, Error> {
        self.cache.open_generation(&self.config.cache_name).await
    }

    pub(crate) async fn set_state(&self, state: WorkerState) {
        self.lifecycle.write().await.state = state;
    }

    /// Best-effort write into the current generation. Failures are logged and
    /// reported as `false`.
    pub(crate) async fn store(&self, key: &RequestKey, response: &Response) -> bool {
        let result = match self.current_cache().await {
            Ok(cache) => cache.put(key, response).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tracing::debug!(cache = %self.config.cache_name, key = %key, "stored response");
                true
            }
            Err(e) => {
                tracing::warn!(cache = %self.config.cache_name, key = %key, error = %e, "cache write failed");
                false
            }
        }
    }

    /// Cross-generation lookup. Store errors degrade to a miss.
    pub(crate) async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        match self.cache.match_any(key).await {
            Ok(Some(entry)) => {
                tracing::debug!(key = %key, generation = %entry.generation, "cache hit");
                Some(entry.response)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl<F: Fetcher> ServiceWorker for CacheEngine<F> {
    async fn on_install(&self) -> InstallReport {
        self.install().await
    }

    async fn on_activate(&self) -> ActivateReport {
        self.activate().await
    }

    async fn on_intercept(&self, request: Request) -> Result<Option<Served>, Error> {
        let route = self.route(&request);
        tracing::debug!(method = %request.method, url = %request.url, route = ?route, "routing request");

        match route {
            Route::MediaPassthrough => Ok(self.media_passthrough(&request).await),
            Route::CacheFirst => self.cache_first(&request).await.map(Some),
            Route::NetworkFirst => Ok(self.network_first(&request).await),
        }
    }

    async fn on_deferred_task(&self, tag: &str) -> Option<PreloadReport> {
        if tag != self.config.preload_tag {
            tracing::debug!(tag, "ignoring unknown deferred task");
            return None;
        }
        Some(self.preload_videos().await)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedFetcher, engine, test_config};
    use super::*;
    use crate::request::Destination;

    #[tokio::test]
    async fn test_new_uses_configured_bust_token() {
        let engine = engine(test_config(), ScriptedFetcher::new()).await;
        assert_eq!(engine.bust_token(), "1700000000000");
    }

    #[tokio::test]
    async fn test_new_stamps_bust_token_from_clock() {
        let config = AppConfig { cache_bust_token: None, ..test_config() };
        let engine = engine(config, ScriptedFetcher::new()).await;
        assert!(engine.bust_token().parse::<i64>().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_new_rejects_bad_origin() {
        let config = AppConfig { origin: "nowhere".into(), ..test_config() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = CacheEngine::new(config, db, ScriptedFetcher::new());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_initial_status() {
        let engine = engine(test_config(), ScriptedFetcher::new()).await;
        let status = engine.status().await;
        assert_eq!(status.state, WorkerState::Parsed);
        assert!(!status.skip_waiting);
        assert!(!status.clients_claimed);
    }

    #[tokio::test]
    async fn test_intercept_dispatches_each_route() {
        let fetcher = ScriptedFetcher::new()
            .respond("https://cdn.example.com/VID1-FUNIL.webm", 200, "video")
            .respond("https://quiz.example/eva.webp", 200, "eva")
            .respond("https://quiz.example/api/data", 200, "{}");
        let engine = engine(test_config(), fetcher).await;
        let origin = engine.origin().clone();

        let cases = [
            ("https://cdn.example.com/VID1-FUNIL.webm", Route::MediaPassthrough),
            ("eva.webp", Route::CacheFirst),
            ("/api/data", Route::NetworkFirst),
        ];
        for (url, route) in cases {
            let request = Request::parse("GET", url, Destination::Empty, Some(&origin)).unwrap();
            let served = engine.on_intercept(request).await.unwrap().unwrap();
            assert_eq!(served.route, route, "{url}");
            assert_eq!(served.source, ResponseSource::Network);
        }
    }

    #[tokio::test]
    async fn test_deferred_task_unknown_tag_is_ignored() {
        let engine = engine(test_config(), ScriptedFetcher::new()).await;
        assert!(engine.on_deferred_task("newsletter-sync").await.is_none());
        assert_eq!(engine.fetcher().total_calls(), 0);
    }
}
