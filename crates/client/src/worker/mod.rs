//! Offline cache manager.
//!
//! Intercepts resource fetches for the countdown page and answers them from
//! the network or a versioned named cache:
//!
//! - Navigations are network-first, raced against [`NAVIGATION_TIMEOUT`]
//! - Static assets are cache-first while younger than [`STATIC_MAX_AGE`]
//! - Each insert is followed by an eviction check against the entry limit
//! - Install, activate, background sync and page commands manage the
//!   cache generation lifecycle
//!
//! Pages are modelled as subscribers of a broadcast channel.

mod assets;
mod eviction;
pub mod fallback;
mod lifecycle;
pub mod messages;
mod navigation;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use expedition_core::{AppConfig, CacheDb, Error, StoredResponse};

use crate::fetch::{FetchRequest, Fetcher, parse_origin};

pub use lifecycle::WorkerState;
pub use messages::{Command, Reply, WorkerEvent};
pub use sync::{SYNC_TAG, SyncReport};

/// How long a navigation waits for the network before falling back.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Cached static assets younger than this are served without a fetch.
pub const STATIC_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const EVENT_CAPACITY: usize = 16;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    Fallback,
    /// Not eligible for caching; forwarded to the network as-is.
    Passthrough,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: StoredResponse,
    pub source: Source,
}

impl Served {
    fn new(response: StoredResponse, source: Source) -> Self {
        Self { response, source }
    }
}

/// Settings for one cache manager instance.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub origin: Url,
    pub version: String,
    pub prefix: String,
    pub max_entries: usize,
    pub precache_urls: Vec<String>,
    pub sync_urls: Vec<String>,
}

impl ManagerConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            origin: parse_origin(&config.origin)?,
            version: config.app_version.clone(),
            prefix: config.cache_prefix.clone(),
            max_entries: config.max_cache_entries,
            precache_urls: config.precache_urls.clone(),
            sync_urls: config.sync_urls.clone(),
        })
    }

    /// Name of this generation's cache, e.g. `countdown-app-1.0.0`.
    pub fn cache_name(&self) -> String {
        format!("{}{}", self.prefix, self.version)
    }
}

pub struct CacheManager {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    config: ManagerConfig,
    cache_name: String,
    events: broadcast::Sender<WorkerEvent>,
    lifecycle: Mutex<lifecycle::Lifecycle>,
}

impl CacheManager {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: ManagerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cache_name = config.cache_name();
        Self { db, fetcher, config, cache_name, events, lifecycle: Mutex::new(lifecycle::Lifecycle::default()) }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn origin(&self) -> &Url {
        &self.config.origin
    }

    /// Connect a page; it receives every later broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    fn broadcast(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("no pages connected; broadcast dropped");
        }
    }

    /// Answer a page request.
    ///
    /// Only pass-through requests can fail; every cacheable request
    /// produces a response.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<Served, Error> {
        if bypasses_cache(&request) {
            tracing::debug!(method = %request.method, url = %request.url, "passing request through");
            let response = self.fetcher.fetch(&request).await?;
            return Ok(Served::new(response.to_stored(), Source::Passthrough));
        }

        if request.is_navigation() {
            Ok(self.serve_navigation(request).await)
        } else {
            Ok(self.serve_static(request).await)
        }
    }

    /// Look up `url` in the current generation, logging storage failures as misses.
    async fn cached(&self, url: &str) -> Option<StoredResponse> {
        match self.db.cache_match(&self.cache_name, Method::GET.as_str(), url).await {
            Ok(entry) => entry.map(|e| e.response),
            Err(e) => {
                tracing::warn!(url, error = %e, "cache lookup failed");
                None
            }
        }
    }
}

/// Requests the manager never caches.
fn bypasses_cache(request: &FetchRequest) -> bool {
    if request.method != Method::GET || request.url.scheme() == "chrome-extension" {
        return true;
    }
    let url = request.url.as_str();
    url.contains("browser-sync") || url.contains("sockjs")
}

/// Cache key URL for a request: the URL without its fragment.
fn key_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::{StatusCode, header};

    use super::*;
    use crate::fetch::FetchResponse;

    #[derive(Clone)]
    pub struct Route {
        pub status: u16,
        pub body: &'static str,
        pub date: Option<String>,
        pub delay: Duration,
        pub failures_before_success: usize,
    }

    impl Route {
        pub fn ok(body: &'static str) -> Self {
            Self { status: 200, body, date: None, delay: Duration::ZERO, failures_before_success: 0 }
        }
    }

    /// In-memory network. Unknown URLs fail with a network error.
    #[derive(Default)]
    pub struct MockFetcher {
        routes: StdMutex<HashMap<String, Route>>,
        calls: StdMutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl MockFetcher {
        pub fn route(&self, url: &str, route: Route) {
            self.routes.lock().unwrap().insert(url.to_string(), route);
        }

        pub fn unroute(&self, url: &str) {
            self.routes.lock().unwrap().remove(url);
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
        }

        pub fn headers_of_last(&self, url: &str) -> Vec<(String, String)> {
            let calls = self.calls.lock().unwrap();
            calls.iter().rev().find(|(u, _)| u == url).map(|(_, h)| h.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
            let url = request.url.to_string();
            self.calls.lock().unwrap().push((url.clone(), request.headers.clone()));

            let route = {
                let mut routes = self.routes.lock().unwrap();
                let Some(route) = routes.get_mut(&url) else {
                    return Err(Error::HttpError(format!("network error: {url} unreachable")));
                };
                if route.failures_before_success > 0 {
                    route.failures_before_success -= 1;
                    return Err(Error::HttpError(format!("network error: {url} flaked")));
                }
                route.clone()
            };

            if !route.delay.is_zero() {
                tokio::time::sleep(route.delay).await;
            }

            let mut headers = header::HeaderMap::new();
            if let Some(date) = &route.date {
                headers.insert(header::DATE, header::HeaderValue::from_str(date).unwrap());
            }
            Ok(FetchResponse {
                url: request.url.clone(),
                final_url: request.url.clone(),
                status: StatusCode::from_u16(route.status).unwrap(),
                content_type: None,
                bytes: Bytes::from_static(route.body.as_bytes()),
                headers,
                fetch_ms: 0,
            })
        }
    }

    pub const ORIGIN: &str = "https://app.example/";

    pub fn config() -> ManagerConfig {
        ManagerConfig {
            origin: Url::parse(ORIGIN).unwrap(),
            version: "1.0.0".to_string(),
            prefix: "countdown-app-".to_string(),
            max_entries: 3,
            precache_urls: vec!["./".into(), "./index.html".into(), "./app.js".into(), "./style.css".into()],
            sync_urls: vec!["./".into(), "./app.js".into()],
        }
    }

    pub async fn manager() -> (Arc<MockFetcher>, CacheManager) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher::default());
        let manager = CacheManager::new(db, fetcher.clone(), config());
        (fetcher, manager)
    }

    pub fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_bypass_rules() {
        assert!(bypasses_cache(&FetchRequest::get(url("/api")).with_method(Method::POST)));
        assert!(bypasses_cache(&FetchRequest::get(Url::parse("chrome-extension://abc/x.js").unwrap())));
        assert!(bypasses_cache(&FetchRequest::get(url("/browser-sync/socket.io/"))));
        assert!(bypasses_cache(&FetchRequest::get(url("/sockjs-node/info"))));
        assert!(!bypasses_cache(&FetchRequest::get(url("/app.js"))));
    }

    #[test]
    fn test_key_url_drops_fragment() {
        assert_eq!(key_url(&url("/index.html#top")), "https://app.example/index.html");
    }

    #[test]
    fn test_config_from_app() {
        let app = AppConfig::default();
        let config = ManagerConfig::from_app_config(&app).unwrap();
        assert_eq!(config.cache_name(), app.cache_name());
        assert_eq!(config.max_entries, 50);

        let bad = AppConfig { origin: "not a url".into(), ..AppConfig::default() };
        assert!(matches!(ManagerConfig::from_app_config(&bad), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_passthrough_not_cached() {
        let (fetcher, manager) = manager().await;
        fetcher.route("https://app.example/api", Route::ok("created"));

        let served = manager
            .handle_fetch(FetchRequest::get(url("/api")).with_method(Method::POST))
            .await
            .unwrap();
        assert_eq!(served.source, Source::Passthrough);
        assert_eq!(manager.db.cache_len(manager.cache_name()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_passthrough_failure_surfaces() {
        let (_, manager) = manager().await;
        let result = manager.handle_fetch(FetchRequest::get(url("/sockjs-node/info"))).await;
        assert!(matches!(result, Err(Error::HttpError(_))));
    }
}
