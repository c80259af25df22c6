//! Opening the storage database.
//!
//! One SQLite file (WAL mode) backs both the key/value state and every
//! named cache. Foreign keys are on, so deleting a cache drops its entries.

use std::path::Path;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA foreign_keys=ON;
     PRAGMA busy_timeout=5000;";

/// Storage handle shared by local key/value state and the named caches.
///
/// Cloning is cheap; every clone talks to the same background connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the database file at `path` and migrate it.
    ///
    /// Missing parent directories are created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::InvalidInput(format!("cannot create storage directory {}: {e}", parent.display()))
                })?;
            }
        }
        tracing::debug!(path = %path.display(), "opening storage");
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// In-memory storage; nothing survives the handle.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Flush and close the background connection.
    ///
    /// Every clone of this handle fails with a database error afterwards.
    pub async fn close(self) -> Result<(), Error> {
        self.conn.close().await.map_err(Error::Database)
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;
        migrations::run(&conn).await?;
        Ok(Self { conn })
    }
}
