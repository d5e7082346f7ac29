//! Core types and the caching policy engine for swcache.
//!
//! This crate provides:
//! - Request/response model shared with the network client
//! - Generation-scoped cache store with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The engine: router, caching strategies, lifecycle and preloader

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod request;

pub use cache::{CacheDb, CacheHandle, EntrySummary, RequestKey, StoredEntry};
pub use config::{AppConfig, ConfigError, InstallKeying};
pub use engine::{
    ActivateReport, CacheEngine, InstallReport, LifecycleStatus, PreloadReport, ResponseSource, Route, Served,
    ServiceWorker, WorkerState,
};
pub use error::Error;
pub use fetch::Fetcher;
pub use request::{Destination, Request, RequestMode, Response, ResponseType};
