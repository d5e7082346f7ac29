//! sw_fetch tool implementation.
//!
//! Delivers one intercepted request to the engine and describes the
//! response it produced.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{
    CacheEngine, Destination, Fetcher, Request, ResponseSource, ResponseType, Route, Served, ServiceWorker,
};

use super::json_result;

/// Largest body returned inline as text.
const MAX_TEXT_BODY: usize = 64 * 1024;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the worker origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request destination such as "image", "video" or "document" (default: empty).
    #[serde(default)]
    pub destination: Option<String>,
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    pub route: Route,
    /// False when neither the network nor the cache could answer.
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub body_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
}

fn is_textual(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime.starts_with("text/") || mime.ends_with("json") || mime.ends_with("xml") || mime.ends_with("javascript")
}

fn describe(request: &Request, route: Route, served: Option<Served>) -> SwFetchOutput {
    let mut output = SwFetchOutput {
        url: request.url.to_string(),
        method: request.method.clone(),
        route,
        resolved: false,
        source: None,
        status: None,
        response_type: None,
        content_type: None,
        body_bytes: 0,
        body_text: None,
    };

    if let Some(served) = served {
        let response = served.response;
        let content_type = response.content_type().map(str::to_string);
        let body_text = content_type
            .as_deref()
            .filter(|ct| is_textual(ct) && response.body.len() <= MAX_TEXT_BODY)
            .map(|_| String::from_utf8_lossy(&response.body).into_owned());

        output.resolved = true;
        output.source = Some(served.source);
        output.status = Some(response.status);
        output.response_type = Some(response.response_type);
        output.content_type = content_type;
        output.body_bytes = response.body.len();
        output.body_text = body_text;
    }

    output
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<F: Fetcher>(engine: &CacheEngine<F>, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let method = params.method.as_deref().unwrap_or("GET");
    let destination = match params.destination.as_deref() {
        Some(d) => d.parse::<Destination>()?,
        None => Destination::Empty,
    };

    let request = Request::parse(method, &params.url, destination, Some(engine.origin()))?;
    let route = engine.route(&request);
    let served = engine.on_intercept(request.clone()).await?;

    if served.is_none() {
        tracing::info!(url = %request.url, route = ?route, "request unresolved");
    }

    json_result(&describe(&request, route, served))
}
