//! Cache-first handling for static assets.

use chrono::{TimeDelta, Utc};
use reqwest::Method;

use super::fallback::asset_stub;
use super::{CacheManager, STATIC_MAX_AGE, Served, Source, key_url};
use crate::fetch::FetchRequest;

impl CacheManager {
    pub(crate) async fn serve_static(&self, request: FetchRequest) -> Served {
        let key = key_url(&request.url);
        let method = Method::GET.as_str();

        let cached = match self.db.cache_match(&self.cache_name, method, &key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "cache lookup failed");
                None
            }
        };

        if let Some(entry) = &cached {
            let max_age = TimeDelta::from_std(STATIC_MAX_AGE).unwrap_or(TimeDelta::MAX);
            if Utc::now() - entry.timestamp() < max_age {
                return Served::new(entry.response.clone(), Source::Cache);
            }
            tracing::debug!(url = %key, "cached asset is stale; refreshing");
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                let stored = response.to_stored();
                if stored.is_ok() {
                    match self.db.cache_put(&self.cache_name, method, &key, &stored).await {
                        Ok(()) => self.enforce_limit().await,
                        Err(e) => tracing::warn!(url = %key, error = %e, "failed to cache asset"),
                    }
                }
                Served::new(stored, Source::Network)
            }
            Err(e) => {
                tracing::info!(url = %key, error = %e, "asset fetch failed");
                match cached {
                    Some(entry) => Served::new(entry.response, Source::Cache),
                    None => Served::new(asset_stub(request.destination), Source::Fallback),
                }
            }
        }
    }
}
