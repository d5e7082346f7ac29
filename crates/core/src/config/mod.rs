//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The defaults describe the quiz deployment: one cache generation, the R2
//! media CDN, the critical page shell and portraits, and the funnel videos.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Key under which install-time manifest responses are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallKeying {
    /// Store under the fetched URL, `?v=<token>` suffix included. Later
    /// lookups for the bare path will not match these entries.
    #[default]
    CacheBusted,
    /// Fetch with the suffix but store under the un-suffixed request.
    Canonical,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Current cache generation. Every other generation is evicted on activate.
    ///
    /// Set via SWCACHE_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Scope URL that relative manifest entries and requests resolve against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Media delivery host prefix. Must end with `/`.
    ///
    /// Set via SWCACHE_CDN_BASE environment variable.
    #[serde(default = "default_cdn_base")]
    pub cdn_base: String,

    /// Resources pre-warmed at install, relative to `origin` or absolute.
    #[serde(default = "default_critical_resources")]
    pub critical_resources: Vec<String>,

    /// Deferred-task tag that triggers the background video preload.
    ///
    /// Set via SWCACHE_PRELOAD_TAG environment variable.
    #[serde(default = "default_preload_tag")]
    pub preload_tag: String,

    /// Asset names appended to `cdn_base` by the preloader.
    #[serde(default = "default_preload_assets")]
    pub preload_assets: Vec<String>,

    /// Whether install stores manifest entries under the cache-busted URL.
    ///
    /// Set via SWCACHE_INSTALL_KEYING environment variable.
    #[serde(default)]
    pub install_keying: InstallKeying,

    /// Fixed cache-busting token. When unset, the engine stamps one from the
    /// clock when it is constructed.
    ///
    /// Set via SWCACHE_CACHE_BUST_TOKEN environment variable.
    #[serde(default)]
    pub cache_bust_token: Option<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to buffer per response. Videos are large.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_cache_name() -> String {
    "quiz-cache-v2".into()
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_cdn_base() -> String {
    "https://pub-ab258eec9fbd44ec967aa5cc0195d16b.r2.dev/".into()
}

fn default_critical_resources() -> Vec<String> {
    [
        "/",
        "/index.html",
        "blonde.webp",
        "brunette.webp",
        "milf.webp",
        "young.webp",
        "maria.webp",
        "lisa.webp",
        "eva.webp",
        "logomilf.jpeg",
        "logonormal.jpeg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_preload_tag() -> String {
    "background-video-preload".into()
}

fn default_preload_assets() -> Vec<String> {
    ["VID1-FUNIL.webm", "VID2-FUNIL.webm", "VID3-FUNIL.webm", "VID4-FUNIL%20(1).webm"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    268_435_456 // 256MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            cdn_base: default_cdn_base(),
            critical_resources: default_critical_resources(),
            preload_tag: default_preload_tag(),
            preload_assets: default_preload_assets(),
            install_keying: InstallKeying::default(),
            cache_bust_token: None,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed scope URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Full preload URLs, each rooted at `cdn_base` by plain concatenation.
    pub fn preload_urls(&self) -> Vec<String> {
        self.preload_assets
            .iter()
            .map(|asset| format!("{}{}", self.cdn_base, asset))
            .collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
