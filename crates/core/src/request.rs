//! Request and response model exchanged between the host, the engine and the
//! network client.
//!
//! ### URL Canonicalization
//! - Trim whitespace, resolve relative references against a base
//! - Lowercase host, remove fragments
//! - Preserve query string

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// What the requester intends to do with the response.
///
/// Mirrors the fetch destinations a page can declare. Only `Image` influences
/// routing; the rest are carried for logging and `Accept` negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    #[serde(rename = "")]
    Empty,
    Audio,
    Document,
    Font,
    Frame,
    Iframe,
    Image,
    Manifest,
    Script,
    Style,
    Track,
    Video,
    Worker,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Empty => "",
            Destination::Audio => "audio",
            Destination::Document => "document",
            Destination::Font => "font",
            Destination::Frame => "frame",
            Destination::Iframe => "iframe",
            Destination::Image => "image",
            Destination::Manifest => "manifest",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Track => "track",
            Destination::Video => "video",
            Destination::Worker => "worker",
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let destination = match s.trim().to_ascii_lowercase().as_str() {
            "" => Destination::Empty,
            "audio" => Destination::Audio,
            "document" => Destination::Document,
            "font" => Destination::Font,
            "frame" => Destination::Frame,
            "iframe" => Destination::Iframe,
            "image" => Destination::Image,
            "manifest" => Destination::Manifest,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "track" => Destination::Track,
            "video" => Destination::Video,
            "worker" => Destination::Worker,
            other => return Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        };
        Ok(destination)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch mode. `NoCors` accepts cross-origin responses as opaque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    #[default]
    Cors,
    NoCors,
}

/// An intercepted (or engine-originated) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Uppercase HTTP method.
    pub method: String,
    /// Canonical absolute URL, never carrying a fragment.
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    /// Build a request, normalizing the method to uppercase and dropping any
    /// fragment from the URL.
    pub fn new(method: &str, mut url: Url, destination: Destination) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, destination }
    }

    /// A plain `GET` with no declared destination.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, Destination::Empty)
    }

    /// Parse a request from user input, resolving `url` against `base` when
    /// it is relative.
    pub fn parse(method: &str, url: &str, destination: Destination, base: Option<&Url>) -> Result<Self, Error> {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        let url = canonicalize(url, base)?;
        Ok(Self::new(method, url, destination))
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Copy of this request with `key=value` appended to the query string.
    pub fn with_query_param(&self, key: &str, value: &str) -> Self {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(key, value);
        Self { method: self.method.clone(), url, destination: self.destination }
    }
}

/// Canonicalize a URL string for consistent cache keys.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve against `base` if the input is relative
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, base: Option<&Url>) -> Result<Url, Error> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?,
            None => return Err(Error::InvalidUrl(format!("relative URL without base: {trimmed}"))),
        },
        Err(e) => return Err(Error::InvalidUrl(format!("{trimmed}: {e}"))),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(lowered.as_str()))
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// How much of a response the engine may inspect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    #[default]
    Basic,
    /// Cross-origin response readable under CORS.
    Cors,
    /// Cross-origin no-cors response: status 0, no headers, body replay only.
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
        }
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// A complete, buffered response.
///
/// Cloning shares the body buffer, so duplicating a response for a cache write
/// does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into(), response_type: ResponseType::Basic }
    }

    /// An opaque response. Status and headers are hidden; only the body is kept
    /// so the entry can be replayed.
    pub fn opaque(body: impl Into<Bytes>) -> Self {
        Self { status: 0, headers: Vec::new(), body: body.into(), response_type: ResponseType::Opaque }
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// True for a readable response with a 2xx status.
    pub fn ok(&self) -> bool {
        self.response_type != ResponseType::Opaque && (200..=299).contains(&self.status)
    }

    pub fn is_opaque(&self) -> bool {
        self.response_type == ResponseType::Opaque
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
