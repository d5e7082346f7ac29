//! Request identity used as the cache key.
//!
//! Both request-keyed strategies and the URL-keyed preloader go through
//! [`RequestKey`], so an entry stored from a bare URL string matches a later
//! `GET` for the same URL.

use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;
use crate::request::{Request, canonicalize};

/// Method plus canonical URL. Destination and fragment never participate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Key for a `GET` of `url`, resolved against `base` when relative.
    pub fn for_url(url: &str, base: Option<&Url>) -> Result<Self, Error> {
        let url = canonicalize(url, base)?;
        Ok(Self { method: "GET".into(), url: url.into() })
    }

    /// Hex SHA-256 digest stored as the row key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl From<&Request> for RequestKey {
    fn from(request: &Request) -> Self {
        Self { method: request.method.clone(), url: request.url.as_str().to_string() }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
