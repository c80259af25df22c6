//! Cache generation lifecycle and page commands.
//!
//! `Parsed -> Installing -> Installed -> Activating -> Activated`. An
//! installed generation waits until skip-waiting is requested, either
//! before or after install completes.

use chrono::Utc;
use reqwest::Method;
use serde::Serialize;

use expedition_core::{Error, StoredResponse};

use super::fallback::precache_stub;
use super::messages::{Command, Reply, WorkerEvent};
use super::CacheManager;
use crate::fetch::{FetchRequest, resolve};

/// Attempts per manifest URL before a stub is stored.
const PRECACHE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

impl CacheManager {
    pub async fn state(&self) -> WorkerState {
        self.lifecycle.lock().await.state
    }

    /// Whether connected pages are controlled by this generation.
    pub async fn controls_clients(&self) -> bool {
        self.lifecycle.lock().await.clients_claimed
    }

    /// Create this generation's cache and pre-populate the manifest.
    ///
    /// Individual URLs that keep failing are replaced by stubs; only a
    /// storage failure aborts the install.
    pub async fn install(&self) -> Result<WorkerState, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.state != WorkerState::Parsed {
                return Ok(lifecycle.state);
            }
            lifecycle.state = WorkerState::Installing;
        }
        tracing::info!(version = %self.config.version, cache = %self.cache_name, "installing");

        if let Err(e) = self.precache().await {
            tracing::error!(error = %e, "installation failed");
            self.lifecycle.lock().await.state = WorkerState::Parsed;
            return Err(e);
        }

        let skip_waiting = {
            let mut lifecycle = self.lifecycle.lock().await;
            lifecycle.state = WorkerState::Installed;
            lifecycle.skip_waiting
        };
        tracing::info!(cache = %self.cache_name, "installation completed");

        if skip_waiting { self.activate().await } else { Ok(WorkerState::Installed) }
    }

    async fn precache(&self) -> Result<(), Error> {
        self.db.open_cache(&self.cache_name).await?;

        for entry in &self.config.precache_urls {
            let url = match resolve(&self.config.origin, entry) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "skipping manifest entry");
                    continue;
                }
            };
            let key = url.to_string();

            let response = match self.fetch_with_retries(FetchRequest::get(url)).await {
                Some(response) => response,
                None => {
                    tracing::warn!(url = %key, "storing stub after repeated failures");
                    precache_stub(&key)
                }
            };
            self.db.cache_put(&self.cache_name, Method::GET.as_str(), &key, &response).await?;
        }
        Ok(())
    }

    /// Fetch up to [`PRECACHE_ATTEMPTS`] times; a non-2xx status counts as failure.
    async fn fetch_with_retries(&self, request: FetchRequest) -> Option<StoredResponse> {
        for attempt in 1..=PRECACHE_ATTEMPTS {
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.status.is_success() => {
                    tracing::debug!(url = %request.url, attempt, "cached manifest entry");
                    return Some(response.to_stored());
                }
                Ok(response) => {
                    tracing::warn!(url = %request.url, attempt, status = response.status.as_u16(), "precache failed")
                }
                Err(e) => tracing::warn!(url = %request.url, attempt, error = %e, "precache failed"),
            }
        }
        None
    }

    /// Remove superseded generations, claim pages and announce activation.
    pub async fn activate(&self) -> Result<WorkerState, Error> {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            match lifecycle.state {
                WorkerState::Installed => lifecycle.state = WorkerState::Activating,
                other => return Ok(other),
            }
        }
        tracing::info!(version = %self.config.version, "activating");

        match self.delete_old_generations().await {
            Ok(deleted) if deleted > 0 => tracing::info!(deleted, "deleted old cache generations"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "failed to delete old cache generations"),
        }

        {
            let mut lifecycle = self.lifecycle.lock().await;
            lifecycle.state = WorkerState::Activated;
            lifecycle.clients_claimed = true;
        }
        self.broadcast(WorkerEvent::Activated {
            version: self.config.version.clone(),
            cache_name: self.cache_name.clone(),
        });
        tracing::info!(cache = %self.cache_name, "activation completed");
        Ok(WorkerState::Activated)
    }

    async fn delete_old_generations(&self) -> Result<usize, Error> {
        let mut deleted = 0;
        for name in self.db.cache_names().await? {
            if name.starts_with(&self.config.prefix) && name != self.cache_name {
                tracing::debug!(cache = %name, "deleting old cache");
                if self.db.delete_cache(&name).await? {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    /// Handle a page command. Only some commands reply.
    pub async fn handle_message(&self, command: Command) -> Result<Option<Reply>, Error> {
        tracing::debug!(?command, "received message");
        match command {
            Command::SkipWaiting => {
                let installed = {
                    let mut lifecycle = self.lifecycle.lock().await;
                    lifecycle.skip_waiting = true;
                    lifecycle.state == WorkerState::Installed
                };
                if installed {
                    self.activate().await?;
                }
                Ok(None)
            }
            Command::GetVersion => Ok(Some(Reply::VersionInfo {
                version: self.config.version.clone(),
                cache_name: self.cache_name.clone(),
                timestamp: Utc::now(),
            })),
            Command::ClearCache => {
                let success = match self.db.delete_cache(&self.cache_name).await {
                    Ok(_) => {
                        tracing::info!(cache = %self.cache_name, "cache cleared");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(cache = %self.cache_name, error = %e, "failed to clear cache");
                        false
                    }
                };
                Ok(Some(Reply::CacheCleared { success }))
            }
        }
    }
}
