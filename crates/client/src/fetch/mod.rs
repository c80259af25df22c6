//! Network access for the cache manager.
//!
//! ### URL Canonicalization
//! - Trim whitespace, lowercase host, remove fragments
//! - Preserve query string
//! - Relative manifest entries resolve against the configured origin
//!
//! ### Fetching
//! - [`Fetcher`] is the seam the cache manager talks to
//! - [`FetchClient`] implements it over reqwest
//! - Non-2xx statuses are returned, not raised; callers decide what to keep

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};
use std::str::FromStr;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, parse_origin, resolve};
pub use reqwest::Method;

use expedition_core::{Error, StoredResponse};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "expedition-countdown/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "expedition-countdown/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &expedition_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Self::default() }
    }
}

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page load.
    Navigate,
    #[default]
    Other,
}

/// What kind of resource the request is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Destination {
    Document,
    Image,
    Style,
    Script,
    Manifest,
    Font,
    #[default]
    Other,
}

impl Destination {
    /// Guess the destination from a URL path extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico" | "avif" => Destination::Image,
            "css" => Destination::Style,
            "js" | "mjs" => Destination::Script,
            "json" | "webmanifest" => Destination::Manifest,
            "woff" | "woff2" | "ttf" | "otf" => Destination::Font,
            "html" | "htm" => Destination::Document,
            _ => Destination::Other,
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    /// Parse a request destination name such as `script` or `image`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "image" => Ok(Destination::Image),
            "style" => Ok(Destination::Style),
            "script" => Ok(Destination::Script),
            "manifest" => Ok(Destination::Manifest),
            "font" => Ok(Destination::Font),
            "" | "other" => Ok(Destination::Other),
            other => Err(Error::InvalidInput(format!("unknown request destination: {other}"))),
        }
    }
}

/// A request as seen by the cache manager.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Subresource GET with destination guessed from the path.
    pub fn get(url: Url) -> Self {
        let destination = Destination::from_path(url.path());
        Self { method: Method::GET, url, mode: RequestMode::Other, destination, headers: Vec::new() }
    }

    /// Top-level page navigation.
    pub fn navigate(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Navigate,
            destination: Destination::Document,
            headers: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Copy into the storable form. Non-UTF-8 header values are dropped.
    pub fn to_stored(&self) -> StoredResponse {
        self.headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .fold(StoredResponse::new(self.status.as_u16(), self.bytes.to_vec()), |resp, (name, value)| {
                resp.with_header(name, value)
            })
    }
}

/// Anything that can perform a network fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
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
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{}: {}", request.url, e))
            } else {
                Error::HttpError(format!("network error: {}", e))
            }
        })?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
