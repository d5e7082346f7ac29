//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::engine::router::{Route, classify};
use crate::request::{Destination, Request, canonicalize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name`, `preload_tag` or `user_agent` is empty
    /// - `origin` or `cdn_base` is not an http(s) URL, or `cdn_base` lacks a trailing `/`
    /// - a manifest entry or preload asset is empty or does not resolve
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 1GB
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }
        if self.preload_tag.trim().is_empty() {
            return Err(invalid("preload_tag", "must not be empty"));
        }
        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "must be an http(s) URL"));
        }

        let cdn_base = canonicalize(&self.cdn_base, None).map_err(|e| invalid("cdn_base", e.to_string()))?;
        if !self.cdn_base.ends_with('/') {
            return Err(invalid("cdn_base", "must end with '/'"));
        }

        for entry in &self.critical_resources {
            canonicalize(entry, Some(&origin))
                .map_err(|e| invalid("critical_resources", format!("{entry:?}: {e}")))?;
        }

        for url in self.preload_urls() {
            if url.len() == self.cdn_base.len() {
                return Err(invalid("preload_assets", "entries must not be empty"));
            }
            let request = Request::parse("GET", &url, Destination::Video, None)
                .map_err(|e| invalid("preload_assets", format!("{url:?}: {e}")))?;
            if classify(&request, cdn_base.as_str()) != Route::MediaPassthrough {
                tracing::warn!(
                    url = %url,
                    "preload asset does not route to the media strategy; \
                     request-time lookups will not serve it network-first"
                );
            }
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 1024 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 1GB"));
        }

        Ok(())
    }
}
