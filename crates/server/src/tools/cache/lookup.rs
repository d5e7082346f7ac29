//! cache_match tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheEngine, Destination, Error, Fetcher, Request, RequestKey, ResponseType};

use crate::tools::json_result;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the worker origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheMatchOutput {
    /// Generation the entry was found in.
    pub generation: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub body_bytes: usize,
    pub stored_at: String,
}

/// Implementation of the cache_match tool.
pub async fn match_impl<F: Fetcher>(
    engine: &CacheEngine<F>, params: CacheMatchParams,
) -> Result<CallToolResult, McpError> {
    let method = params.method.as_deref().unwrap_or("GET");
    let request = Request::parse(method, &params.url, Destination::Empty, Some(engine.origin()))?;
    let key = RequestKey::from(&request);

    let entry = engine
        .cache()
        .match_any(&key)
        .await?
        .ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let response = entry.response;
    let output = CacheMatchOutput {
        generation: entry.generation,
        method: entry.key.method,
        url: entry.key.url,
        status: response.status,
        response_type: response.response_type,
        content_type: response.content_type().map(str::to_string),
        body_bytes: response.body.len(),
        stored_at: entry.stored_at,
    };

    json_result(&output)
}
