//! Durable local key/value storage.
//!
//! Plain get/set/remove over the `kv_store` table. There is no transaction
//! spanning multiple keys.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl CacheDb {
    /// Read a value; `None` if the key was never set or has been removed.
    pub async fn kv_get(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite a value.
    pub async fn kv_set(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a key. Returns whether it existed.
    pub async fn kv_remove(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.kv_set("optimisticMode", "true").await.unwrap();
        assert_eq!(db.kv_get("optimisticMode").await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.kv_get("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.kv_set("k", "one").await.unwrap();
        db.kv_set("k", "two").await.unwrap();
        assert_eq!(db.kv_get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_remove() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.kv_set("k", "v").await.unwrap();
        assert!(db.kv_remove("k").await.unwrap());
        assert!(!db.kv_remove("k").await.unwrap());
        assert!(db.kv_get("k").await.unwrap().is_none());
    }
}
