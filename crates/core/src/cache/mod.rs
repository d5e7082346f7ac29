//! SQLite-backed cache store organised in named generations.
//!
//! This module provides the cache store the engine reads and writes, using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Open-or-create of a named generation, enumeration and bulk deletion
//! - Request-keyed put/match with SHA-256 key digests
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{EntrySummary, StoredEntry};
pub use generations::CacheHandle;
pub use key::RequestKey;
