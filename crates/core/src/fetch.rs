//! Network primitive consumed by the engine.
//!
//! The engine never talks to the network directly; the host hands it a
//! [`Fetcher`]. `swcache-client` provides the reqwest-backed implementation.

use async_trait::async_trait;

use crate::{Error, Request, RequestMode, Response};

/// A single network attempt for a request.
///
/// Implementations resolve with whatever response the server produced, any
/// status included. `Err` means the fetch was rejected (offline, DNS failure,
/// timeout) and no response exists. Implementations must not retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request, mode: RequestMode) -> Result<Response, Error>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: &Request, mode: RequestMode) -> Result<Response, Error> {
        (**self).fetch(request, mode).await
    }
}
