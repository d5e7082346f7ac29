//! Cache inspection MCP tools.
//!
//! Read-only views of the generation store; neither tool touches the network.

pub mod keys;
pub mod lookup;

pub use keys::{CacheKeysParams, keys_impl};
pub use lookup::{CacheMatchParams, match_impl};
