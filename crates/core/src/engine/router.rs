//! Request classification.
//!
//! Total over all requests: the first matching rule wins and `NetworkFirst`
//! is the explicit default. Matching is by substring over the full URL, so
//! an extension in the query string counts too.

use schemars::JsonSchema;
use serde::Serialize;

use crate::request::{Destination, Request};

const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".webm"];
const IMAGE_EXTENSIONS: &[&str] = &[".webp", ".jpeg", ".jpg", ".png"];

/// Strategy a request is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Video from the CDN: network first, write-through on 200.
    MediaPassthrough,
    /// Images: cache first, network on miss.
    CacheFirst,
    /// Everything else: network first, cache on rejection, no write-back.
    NetworkFirst,
}

/// Classify `request`. `cdn_base` is the canonical media host prefix.
pub fn classify(request: &Request, cdn_base: &str) -> Route {
    let href = request.url.as_str();

    if href.contains(cdn_base) && MEDIA_EXTENSIONS.iter().any(|ext| href.contains(ext)) {
        return Route::MediaPassthrough;
    }

    if request.destination == Destination::Image || IMAGE_EXTENSIONS.iter().any(|ext| href.contains(ext)) {
        return Route::CacheFirst;
    }

    Route::NetworkFirst
}
