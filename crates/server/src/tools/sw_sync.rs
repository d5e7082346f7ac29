//! sw_sync tool implementation.
//!
//! Delivers a deferred-task (background sync) signal to the engine.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheEngine, Fetcher, PreloadReport, ServiceWorker};

use super::json_result;

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Task tag. Defaults to the configured video preload tag.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Output from the sw_sync tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    /// False when the tag names no known task.
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PreloadReport>,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl<F: Fetcher>(engine: &CacheEngine<F>, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| engine.config().preload_tag.clone());
    let report = engine.on_deferred_task(&tag).await;

    json_result(&SwSyncOutput { tag, handled: report.is_some(), report })
}
