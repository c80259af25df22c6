//! Persistence of the expedition record and mode flag.

use crate::cache::CacheDb;
use crate::Error;

use super::countdown::Mode;
use super::record::ExpeditionRecord;

pub const RECORD_KEY: &str = "expeditionData";
pub const MODE_KEY: &str = "optimisticMode";

/// What was found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stored {
    pub record: Option<ExpeditionRecord>,
    pub mode: Mode,
}

/// Reads and writes the two expedition keys of the local key/value store.
#[derive(Debug, Clone)]
pub struct ExpeditionStore {
    db: CacheDb,
}

impl ExpeditionStore {
    pub fn new(db: CacheDb) -> Self {
        Self { db }
    }

    /// Load the stored record and mode.
    ///
    /// A record that does not decode yields [`Error::StorageCorrupt`].
    pub async fn load(&self) -> Result<Stored, Error> {
        let record = match self.db.kv_get(RECORD_KEY).await? {
            Some(json) => Some(serde_json::from_str::<ExpeditionRecord>(&json)?),
            None => None,
        };
        let mode = self.db.kv_get(MODE_KEY).await?.map(|flag| Mode::from_flag(&flag)).unwrap_or_default();
        Ok(Stored { record, mode })
    }

    pub async fn save_record(&self, record: &ExpeditionRecord) -> Result<(), Error> {
        let json = serde_json::to_string(record).map_err(|e| Error::InvalidInput(e.to_string()))?;
        self.db.kv_set(RECORD_KEY, &json).await
    }

    pub async fn save_mode(&self, mode: Mode) -> Result<(), Error> {
        self.db.kv_set(MODE_KEY, mode.as_flag()).await
    }

    /// Remove both keys.
    pub async fn clear(&self) -> Result<(), Error> {
        self.db.kv_remove(RECORD_KEY).await?;
        self.db.kv_remove(MODE_KEY).await?;
        tracing::debug!("expedition storage cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expedition::record::parse_datetime;

    async fn store() -> (CacheDb, ExpeditionStore) {
        let db = CacheDb::open_in_memory().await.unwrap();
        (db.clone(), ExpeditionStore::new(db))
    }

    fn record() -> ExpeditionRecord {
        ExpeditionRecord {
            start: parse_datetime("start", "2025-01-01T00:00:00").unwrap(),
            end: parse_datetime("end", "2025-01-08T00:00:00").unwrap(),
            optimistic_end: Some(parse_datetime("optimistic", "2025-01-05T00:00:00").unwrap()),
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (_, store) = store().await;
        let stored = store.load().await.unwrap();
        assert!(stored.record.is_none());
        assert_eq!(stored.mode, Mode::Realistic);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (db, store) = store().await;
        store.save_record(&record()).await.unwrap();
        store.save_mode(Mode::Optimistic).await.unwrap();

        let stored = store.load().await.unwrap();
        assert_eq!(stored.record, Some(record()));
        assert_eq!(stored.mode, Mode::Optimistic);
        assert_eq!(db.kv_get(MODE_KEY).await.unwrap().as_deref(), Some("true"));

        let raw = db.kv_get(RECORD_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"start_date\""));
    }

    #[tokio::test]
    async fn test_corrupt_record() {
        let (db, store) = store().await;
        db.kv_set(RECORD_KEY, "{not json").await.unwrap();
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::StorageCorrupt(_)));
    }

    #[tokio::test]
    async fn test_clear() {
        let (db, store) = store().await;
        store.save_record(&record()).await.unwrap();
        store.save_mode(Mode::Optimistic).await.unwrap();
        store.clear().await.unwrap();

        assert!(db.kv_get(RECORD_KEY).await.unwrap().is_none());
        assert!(db.kv_get(MODE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_space_separated_dates() {
        let (db, store) = store().await;
        db.kv_set(
            RECORD_KEY,
            r#"{"start_date":"2025-01-01 00:00:00","end_date":"2025-01-08 00:00:00","optimistic_end_date":"2025-01-05 00:00"}"#,
        )
        .await
        .unwrap();

        let stored = store.load().await.unwrap();
        assert_eq!(stored.record, Some(record()));
    }
}
