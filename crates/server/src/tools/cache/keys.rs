//! cache_keys tool implementation.
//!
//! Lists the generations in the store and the entries of one of them.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheEngine, EntrySummary, Error, Fetcher};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Generation to list (default: the current one).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub generations: Vec<String>,
    pub generation: String,
    pub entries: Vec<EntrySummary>,
}

/// Implementation of the cache_keys tool.
///
/// An unknown generation is reported as a miss; listing never creates one.
pub async fn keys_impl<F: Fetcher>(engine: &CacheEngine<F>, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let db = engine.cache();
    let generation = params.generation.unwrap_or_else(|| engine.config().cache_name.clone());
    if !db.has_generation(&generation).await? {
        return Err(Error::CacheMiss(format!("no cache named {generation}")).into());
    }

    let generations = db.generation_names().await?;

    let entries = db.open_generation(&generation).await?.entries().await?;

    json_result(&CacheKeysOutput { generations, generation, entries })
}
