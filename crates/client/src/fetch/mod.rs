//! HTTP fetch primitive backing the engine.
//!
//! ### Semantics
//! - One attempt per call, no retries
//! - Any HTTP status resolves; only transport failures reject
//! - Redirects followed up to a limit; the final URL decides tainting
//! - Max body bytes configurable (videos are buffered whole)
//!
//! ### No-cors
//! - Cross-origin responses fetched in `RequestMode::NoCors` become opaque:
//!   status 0, no headers, body kept for replay.

pub mod origin;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};
use url::Url;

pub use origin::{response_type, same_origin};

use swcache_core::{AppConfig, Destination, Error, Fetcher, Request, RequestMode, Response, ResponseType};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 256MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Page origin the worker runs under; decides same- vs cross-origin.
    pub origin: Url,
}

impl FetchConfig {
    /// Settings for a worker running under `origin`, other fields at their defaults.
    pub fn new(origin: Url) -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 256 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin,
        }
    }

    /// Derive the fetch settings from the application config.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            origin,
        })
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// `Accept` header a browser would send for `destination`.
fn accept_for(destination: Destination) -> Option<&'static str> {
    match destination {
        Destination::Document | Destination::Frame | Destination::Iframe => {
            Some("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        }
        Destination::Image => Some("image/avif,image/webp,image/apng,image/*,*/*;q=0.8"),
        Destination::Style => Some("text/css,*/*;q=0.1"),
        _ => None,
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request, mode: RequestMode) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        if let Some(accept) = accept_for(request.destination) {
            builder = builder.header(header::ACCEPT, accept);
        }

        let response = builder.send().await.map_err(network_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(network_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let response_type = response_type(mode, &self.config.origin, &final_url);

        tracing::debug!(
            "fetched {} -> {} status {} ({}) in {}ms ({} bytes)",
            request.url,
            final_url,
            status,
            response_type.as_str(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(match response_type {
            ResponseType::Opaque => Response::opaque(bytes),
            other => Response::new(status, headers, bytes).with_type(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> FetchConfig {
        FetchConfig::new(Url::parse("http://localhost:8080/").unwrap())
    }

    #[test]
    fn test_fetch_config_new_defaults() {
        let config = local();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 256 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.origin.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig {
            origin: "https://quiz.example/".into(),
            user_agent: "quiz-worker/2".into(),
            timeout_ms: 5_000,
            ..Default::default()
        };
        let config = FetchConfig::from_app(&app).unwrap();
        assert_eq!(config.origin.as_str(), "https://quiz.example/");
        assert_eq!(config.user_agent, "quiz-worker/2");
        assert_eq!(config.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn test_fetch_config_from_app_bad_origin() {
        let app = AppConfig { origin: "quiz".into(), ..Default::default() };
        assert!(matches!(FetchConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_accept_for_destination() {
        assert!(accept_for(Destination::Image).unwrap().starts_with("image/"));
        assert!(accept_for(Destination::Document).unwrap().starts_with("text/html"));
        assert!(accept_for(Destination::Video).is_none());
        assert!(accept_for(Destination::Empty).is_none());
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(local());
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_method_rejected_before_network() {
        let fetcher = HttpFetcher::new(local()).unwrap();
        let request = Request {
            method: "BAD METHOD".into(),
            url: Url::parse("http://localhost:8080/").unwrap(),
            destination: Destination::Empty,
        };
        let result = fetcher.fetch(&request, RequestMode::Cors).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
