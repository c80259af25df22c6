//! Size bound for the current cache generation.

use expedition_core::Error;

use super::CacheManager;

impl CacheManager {
    /// Trim the current cache back to the entry limit, oldest first.
    ///
    /// Failures are logged and swallowed; an eviction problem never fails
    /// the request that triggered it.
    pub(crate) async fn enforce_limit(&self) {
        match self.evict_oldest().await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(cache = %self.cache_name, removed, "evicted old cache entries"),
            Err(e) => tracing::warn!(cache = %self.cache_name, error = %e, "cache eviction failed"),
        }
    }

    async fn evict_oldest(&self) -> Result<usize, Error> {
        let mut stamps = self.db.cache_keys(&self.cache_name).await?;
        let limit = self.config.max_entries;
        if stamps.len() <= limit {
            return Ok(0);
        }

        stamps.sort_by_key(|stamp| stamp.timestamp());
        let excess = stamps.len() - limit;
        for stamp in stamps.iter().take(excess) {
            tracing::debug!(url = %stamp.url, at = %stamp.timestamp(), "evicting cache entry");
            self.db.cache_delete(&self.cache_name, &stamp.key_hash).await?;
        }
        Ok(excess)
    }
}
