//! cache_fetch tool implementation.
//!
//! Issues a request through the cache manager exactly as a page would and
//! reports which strategy answered it.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use expedition_client::fetch::{Destination, FetchRequest, Method, resolve};
use expedition_client::{CacheManager, Source};
use expedition_core::Error;

use crate::tools::json_result;

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Absolute URL or a path relative to the app origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else bypasses the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Resource kind (`script`, `style`, `image`, `font`, `manifest`, `document`).
    /// Guessed from the path when omitted.
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheFetchOutput {
    pub url: String,
    pub status: u16,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub async fn fetch_impl(manager: &CacheManager, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(manager.origin(), &params.url).map_err(Error::from)?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid HTTP method: {}", params.method)))?;

    let mut request = if params.navigate { FetchRequest::navigate(url.clone()) } else { FetchRequest::get(url.clone()) };
    request = request.with_method(method);
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(destination.parse::<Destination>()?);
    }

    let served = manager.handle_fetch(request).await?;
    tracing::info!(url = %url, source = ?served.source, status = served.response.status_code, "cache_fetch served");

    json_result(&CacheFetchOutput {
        url: url.to_string(),
        status: served.response.status_code,
        source: served.source,
        content_type: served.response.content_type().map(str::to_string),
        headers: served.response.headers.clone(),
        body: String::from_utf8_lossy(&served.response.body).into_owned(),
    })
}
