//! sw_install, sw_activate and sw_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use swcache_core::{CacheEngine, Fetcher, LifecycleStatus, ServiceWorker};

use super::json_result;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwStatusOutput {
    pub lifecycle: LifecycleStatus,
    /// Generation the worker writes to.
    pub cache_name: String,
    /// Every generation in the store, oldest first.
    pub generations: Vec<String>,
    pub origin: String,
    pub cdn_base: String,
    pub bust_token: String,
}

/// Implementation of the sw_install tool.
pub async fn install_impl<F: Fetcher>(engine: &CacheEngine<F>) -> Result<CallToolResult, McpError> {
    let report = engine.on_install().await;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl<F: Fetcher>(engine: &CacheEngine<F>) -> Result<CallToolResult, McpError> {
    let report = engine.on_activate().await;
    json_result(&report)
}

/// Implementation of the sw_status tool.
pub async fn status_impl<F: Fetcher>(engine: &CacheEngine<F>) -> Result<CallToolResult, McpError> {
    let output = SwStatusOutput {
        lifecycle: engine.status().await,
        cache_name: engine.config().cache_name.clone(),
        generations: engine.cache().generation_names().await?,
        origin: engine.origin().to_string(),
        cdn_base: engine.cdn_base().to_string(),
        bust_token: engine.bust_token().to_string(),
    };
    json_result(&output)
}
