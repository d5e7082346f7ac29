//! MCP server handler implementation.
//!
//! Each tool delivers one host event to the engine, or inspects the cache
//! store it owns.
use std::sync::Arc;

use crate::tools::cache::{CacheKeysParams, CacheMatchParams, keys_impl, match_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};
use crate::tools::sw_sync::{SwSyncParams, sync_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::HttpFetcher;
use swcache_core::CacheEngine;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    engine: Arc<CacheEngine<HttpFetcher>>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a registered engine.
    pub fn new(engine: Arc<CacheEngine<HttpFetcher>>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    #[tool(description = "Re-run the install transition: pre-warm the current cache generation with the critical resources.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(self.engine.as_ref()).await
    }

    #[tool(description = "Re-run the activate transition: delete every cache generation except the current one.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(self.engine.as_ref()).await
    }

    #[tool(description = "Report worker lifecycle state, the current cache generation and all existing generations.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(self.engine.as_ref()).await
    }

    /// Intercept a request.
    ///
    /// Routes it to media passthrough, image cache-first or network-first and
    /// reports where the response came from.
    #[tool(
        description = "Intercept a request through the caching engine. Returns the route, the response source (network/cache) and response metadata, or resolved=false when neither network nor cache could answer."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.engine.as_ref(), params.0).await
    }

    #[tool(description = "Deliver a deferred-task (background sync) signal. The video preload tag fetches and caches the CDN videos.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(self.engine.as_ref(), params.0).await
    }

    #[tool(description = "List the entries of a cache generation (defaults to the current one).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.engine.as_ref(), params.0).await
    }

    #[tool(description = "Look a request up across all cache generations without touching the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(self.engine.as_ref(), params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swcache_client::FetchConfig;
    use swcache_core::{AppConfig, CacheDb};

    async fn server() -> SwCacheServer {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = HttpFetcher::new(FetchConfig::from_app(&AppConfig::default()).unwrap()).unwrap();
        let engine = CacheEngine::new(AppConfig::default(), db, fetcher).unwrap();
        SwCacheServer::new(Arc::new(engine))
    }

    #[tokio::test]
    async fn test_registers_every_tool() {
        let server = server().await;
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec!["cache_keys", "cache_match", "sw_activate", "sw_fetch", "sw_install", "sw_status", "sw_sync"]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let info = server().await.get_info();
        assert_eq!(info.server_info.name, "swcache");
        assert!(info.capabilities.tools.is_some());
    }
}
