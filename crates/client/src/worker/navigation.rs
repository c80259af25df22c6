//! Network-first handling for page navigations.

use std::sync::Arc;

use reqwest::Method;

use super::fallback::offline_page;
use super::{CacheManager, NAVIGATION_TIMEOUT, Served, Source, key_url};
use crate::fetch::{FetchRequest, resolve};

/// Cached shells tried, in order, when the exact page is not cached.
const SHELL_URLS: &[&str] = &["./", "./index.html", "/", "/index.html"];

impl CacheManager {
    pub(crate) async fn serve_navigation(&self, request: FetchRequest) -> Served {
        let key = key_url(&request.url);
        let fetcher = Arc::clone(&self.fetcher);
        let in_flight = request.clone();

        // The spawned fetch outlives a timeout; its result is then dropped.
        let handle = tokio::spawn(async move { fetcher.fetch(&in_flight).await });

        match tokio::time::timeout(NAVIGATION_TIMEOUT, handle).await {
            Ok(Ok(Ok(response))) => {
                let stored = response.to_stored();
                if stored.is_ok() {
                    match self.db.cache_put(&self.cache_name, Method::GET.as_str(), &key, &stored).await {
                        Ok(()) => self.enforce_limit().await,
                        Err(e) => tracing::warn!(url = %key, error = %e, "failed to cache navigation response"),
                    }
                }
                Served::new(stored, Source::Network)
            }
            Ok(Ok(Err(e))) => {
                tracing::info!(url = %key, error = %e, "navigation fetch failed; trying cache");
                self.navigation_fallback(&key).await
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %key, error = %e, "navigation fetch task failed");
                self.navigation_fallback(&key).await
            }
            Err(_) => {
                tracing::info!(url = %key, timeout = ?NAVIGATION_TIMEOUT, "navigation timed out; trying cache");
                self.navigation_fallback(&key).await
            }
        }
    }

    async fn navigation_fallback(&self, key: &str) -> Served {
        if let Some(cached) = self.cached(key).await {
            return Served::new(cached, Source::Cache);
        }

        for shell in SHELL_URLS {
            let Ok(url) = resolve(&self.config.origin, shell) else {
                continue;
            };
            if let Some(cached) = self.cached(url.as_str()).await {
                tracing::debug!(shell = %url, "serving cached shell for navigation");
                return Served::new(cached, Source::Cache);
            }
        }

        tracing::info!(url = %key, "serving offline page");
        Served::new(offline_page(), Source::Fallback)
    }
}
