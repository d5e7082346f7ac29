//! MCP tool implementations.
//!
//! Every tool takes the engine by reference and is generic over the
//! [`Fetcher`](swcache_core::Fetcher), so tests drive them with an in-memory
//! network.

pub mod cache;
pub mod lifecycle;
pub mod sw_fetch;
pub mod sw_sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use swcache_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(output).map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use swcache_core::{AppConfig, CacheDb, CacheEngine, Error, Fetcher, Request, RequestMode, Response};

    /// Fixed URL → response table; anything else fails like an offline network.
    #[derive(Default)]
    pub(crate) struct StaticFetcher {
        responses: HashMap<String, Response>,
    }

    impl StaticFetcher {
        pub(crate) fn with(mut self, url: &str, response: Response) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, request: &Request, _mode: RequestMode) -> Result<Response, Error> {
            self.responses
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| Error::Network(format!("offline: {}", request.url)))
        }
    }

    pub(crate) fn config() -> AppConfig {
        AppConfig {
            origin: "https://quiz.example/".into(),
            cdn_base: "https://cdn.example.com/".into(),
            critical_resources: vec!["/index.html".into()],
            preload_assets: vec!["VID1-FUNIL.webm".into()],
            cache_bust_token: Some("42".into()),
            ..Default::default()
        }
    }

    pub(crate) async fn engine(fetcher: StaticFetcher) -> CacheEngine<StaticFetcher> {
        let db = CacheDb::open_in_memory().await.unwrap();
        CacheEngine::new(config(), db, fetcher).unwrap()
    }

    /// Parse the JSON text payload of a successful tool result.
    pub(crate) fn json(result: &CallToolResult) -> serde_json::Value {
        let text = &result.content[0].as_text().unwrap().text;
        serde_json::from_str(text).unwrap()
    }
}
