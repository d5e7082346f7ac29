//! Network client for swcache.
//!
//! This crate provides the reqwest-backed [`HttpFetcher`], the network
//! primitive the engine's strategies, install and preloader fetch through.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher};
