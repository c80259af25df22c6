//! Background refresh of the critical URL set.

use chrono::Utc;
use reqwest::Method;
use serde::Serialize;

use super::CacheManager;
use super::messages::WorkerEvent;
use crate::fetch::{FetchRequest, resolve};

/// The only sync tag acted upon.
pub const SYNC_TAG: &str = "background-sync";

/// Result of a sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub refreshed: usize,
    pub failed: usize,
}

impl CacheManager {
    /// Handle a sync event. Returns `None` for tags other than [`SYNC_TAG`].
    pub async fn sync(&self, tag: &str) -> Option<SyncReport> {
        tracing::debug!(tag, "background sync requested");
        if tag != SYNC_TAG {
            return None;
        }
        Some(self.refresh_critical().await)
    }

    async fn refresh_critical(&self) -> SyncReport {
        let mut report = SyncReport { refreshed: 0, failed: 0 };

        for entry in &self.config.sync_urls {
            let url = match resolve(&self.config.origin, entry) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "skipping sync entry");
                    report.failed += 1;
                    continue;
                }
            };
            let key = url.to_string();
            let request = FetchRequest::get(url).with_header("Cache-Control", "no-cache");

            match self.fetcher.fetch(&request).await {
                Ok(response) if response.status.as_u16() == 200 => {
                    match self.db.cache_put(&self.cache_name, Method::GET.as_str(), &key, &response.to_stored()).await {
                        Ok(()) => {
                            tracing::debug!(url = %key, "refreshed in cache");
                            report.refreshed += 1;
                        }
                        Err(e) => {
                            tracing::warn!(url = %key, error = %e, "failed to store refreshed entry");
                            report.failed += 1;
                        }
                    }
                }
                Ok(response) => {
                    tracing::warn!(url = %key, status = response.status.as_u16(), "refresh returned non-200");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(url = %key, error = %e, "failed to refresh");
                    report.failed += 1;
                }
            }
        }

        self.broadcast(WorkerEvent::SyncComplete { timestamp: Utc::now() });
        tracing::info!(refreshed = report.refreshed, failed = report.failed, "background sync completed");
        report
    }
}

#[cfg(test)]
mod tests {
    use expedition_core::StoredResponse;

    use super::super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_other_tags_ignored() {
        let (fetcher, manager) = manager().await;
        assert!(manager.sync("periodic-refresh").await.is_none());
        assert_eq!(fetcher.calls_to("https://app.example/"), 0);
    }

    #[tokio::test]
    async fn test_refresh_overwrites_and_broadcasts() {
        let (fetcher, manager) = manager().await;
        let old = StoredResponse::new(200, "old()");
        manager.db.cache_put(manager.cache_name(), "GET", "https://app.example/app.js", &old).await.unwrap();
        fetcher.route("https://app.example/app.js", Route::ok("new()"));
        let mut page = manager.subscribe();

        let report = manager.sync(SYNC_TAG).await.unwrap();
        assert_eq!(report, SyncReport { refreshed: 1, failed: 1 });

        let entry = manager.db.cache_match(manager.cache_name(), "GET", "https://app.example/app.js").await.unwrap();
        assert_eq!(entry.unwrap().response.body, b"new()");
        assert!(matches!(page.recv().await.unwrap(), WorkerEvent::SyncComplete { .. }));
    }

    #[tokio::test]
    async fn test_sends_no_cache() {
        let (fetcher, manager) = manager().await;
        fetcher.route("https://app.example/", Route::ok("<html></html>"));
        manager.sync(SYNC_TAG).await.unwrap();

        let headers = fetcher.headers_of_last("https://app.example/");
        assert!(headers.contains(&("Cache-Control".to_string(), "no-cache".to_string())));
    }

    #[tokio::test]
    async fn test_non_200_keeps_old_entry() {
        let (fetcher, manager) = manager().await;
        let old = StoredResponse::new(200, "<html>old</html>");
        manager.db.cache_put(manager.cache_name(), "GET", "https://app.example/", &old).await.unwrap();
        fetcher.route("https://app.example/", Route { status: 204, ..Route::ok("") });

        manager.sync(SYNC_TAG).await.unwrap();
        let entry = manager.db.cache_match(manager.cache_name(), "GET", "https://app.example/").await.unwrap();
        assert_eq!(entry.unwrap().response.body, old.body);
    }
}
