//! Cache manager MCP tools.
//!
//! This module exposes the offline cache manager: fetching through it,
//! sending page commands and triggering background sync.

pub mod fetch;
pub mod message;
pub mod sync;

pub use fetch::{CacheFetchParams, fetch_impl};
pub use message::{WorkerMessageParams, message_impl};
pub use sync::{CacheSyncParams, sync_impl};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;
    use expedition_client::{CacheManager, FetchRequest, FetchResponse, Fetcher, ManagerConfig};
    use expedition_core::{CacheDb, Error};

    /// Network that is always down.
    pub struct Offline;

    #[async_trait]
    impl Fetcher for Offline {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
            Err(Error::HttpError(format!("network error: {} unreachable", request.url)))
        }
    }

    pub async fn offline_manager() -> (CacheDb, CacheManager) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = ManagerConfig {
            origin: "https://app.example/".parse().unwrap(),
            version: "1.0.0".into(),
            prefix: "countdown-app-".into(),
            max_entries: 50,
            precache_urls: vec!["./".into(), "./app.js".into()],
            sync_urls: vec!["./".into()],
        };
        (db.clone(), CacheManager::new(db, Arc::new(Offline), config))
    }
}
