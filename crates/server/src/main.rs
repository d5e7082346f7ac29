//! swcache server entry point.
//!
//! Boots the caching engine, registers it (install, then activate) and
//! serves its events as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchConfig, HttpFetcher};
use swcache_core::{AppConfig, CacheDb, CacheEngine, ServiceWorker};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        cache = %config.cache_name,
        db_path = %config.db_path.display(),
        "Starting swcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app(&config)?)?;
    let engine = Arc::new(CacheEngine::new(config, db, fetcher)?);

    engine.on_install().await;
    engine.on_activate().await;

    let handler = handler::SwCacheServer::new(engine);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
