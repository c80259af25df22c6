//! Named cache storage.
//!
//! Mirrors the browser cache-storage surface: caches are opened by name,
//! entries are matched, put and deleted by request identity, and whole
//! caches can be listed and dropped. Entries cascade with their cache.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response as held in (or served from) a cache.
///
/// Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status_code, headers: BTreeMap::new(), body: body.into() }
    }

    /// Builder-style header insertion.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Parsed `date` header, if present and well-formed.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date").and_then(parse_http_date)
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Parse an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim()).ok().map(|d| d.with_timezone(&Utc))
}

/// Format a timestamp as an HTTP-date.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// A cached request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_name: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub response: StoredResponse,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Timestamp used for freshness and eviction: the response `date`
    /// header, else the capture time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.response.date().unwrap_or(self.stored_at)
    }
}

/// Entry metadata without the body, used when scanning for eviction.
#[derive(Debug, Clone)]
pub struct EntryStamp {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub date_header: Option<String>,
    pub stored_at: DateTime<Utc>,
}

impl EntryStamp {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.date_header.as_deref().and_then(parse_http_date).unwrap_or(self.stored_at)
    }
}

fn parse_stored_at(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::StorageCorrupt(format!("bad stored_at {raw:?}: {e}")))
}

impl CacheDb {
    /// Open (creating if needed) a named cache.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all caches, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a named cache and all of its entries. Returns whether it existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store or refresh the entry for `method url`, opening the cache if needed.
    ///
    /// Refreshing resets the capture time.
    pub async fn cache_put(&self, name: &str, method: &str, url: &str, response: &StoredResponse) -> Result<(), Error> {
        let name = name.to_string();
        let method = method.to_ascii_uppercase();
        let url = url.to_string();
        let key_hash = request_key(&method, &url);
        let headers_json = serde_json::to_string(&response.headers)?;
        let status_code = response.status_code as i64;
        let body = response.body.clone();
        let stored_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, stored_at],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        cache_name, key_hash, method, url, status_code, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                        status_code = excluded.status_code,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![name, key_hash, method, url, status_code, headers_json, body, stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `method url` in a named cache.
    pub async fn cache_match(&self, name: &str, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let name = name.to_string();
        let key_hash = request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let result = conn.query_row(
                    "SELECT method, url, status_code, headers_json, body, stored_at
                    FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    },
                );

                let (method, url, status_code, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                let status_code = u16::try_from(status_code)
                    .map_err(|_| Error::StorageCorrupt(format!("bad status code {status_code}")))?;

                Ok(Some(CacheEntry {
                    cache_name: name,
                    key_hash,
                    method,
                    url,
                    response: StoredResponse { status_code, headers, body },
                    stored_at: parse_stored_at(&stored_at)?,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry by key hash. Returns whether it existed.
    pub async fn cache_delete(&self, name: &str, key_hash: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List every entry of a named cache without bodies.
    pub async fn cache_keys(&self, name: &str) -> Result<Vec<EntryStamp>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryStamp>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, headers_json, stored_at
                    FROM cache_entries WHERE cache_name = ?1",
                )?;
                let rows = stmt
                    .query_map(params![name], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(key_hash, method, url, headers_json, stored_at)| -> Result<EntryStamp, Error> {
                        let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                        Ok(EntryStamp {
                            key_hash,
                            method,
                            url,
                            date_header: headers.get("date").cloned(),
                            stored_at: parse_stored_at(&stored_at)?,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a named cache.
    pub async fn cache_len(&self, name: &str) -> Result<usize, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: &str = "countdown-app-1.0.0";

    fn html(body: &str) -> StoredResponse {
        StoredResponse::new(200, body).with_header("Content-Type", "text/html")
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let response = html("x");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.content_type(), Some("text/html"));
    }

    #[test]
    fn test_http_date_roundtrip_precision() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(parsed.to_rfc3339(), "1994-11-06T08:49:37+00:00");
        assert_eq!(format_http_date(parsed), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_bad_date_header_ignored() {
        let response = html("x").with_header("Date", "yesterday-ish");
        assert!(response.date().is_none());
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/", &html("<h1>hi</h1>"))
            .await
            .unwrap();

        let entry = db.cache_match(CACHE, "GET", "https://example.com/").await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"<h1>hi</h1>");
        assert_eq!(entry.response.content_type(), Some("text/html"));
        assert!(db.has_cache(CACHE).await.unwrap());
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_cache(CACHE).await.unwrap();
        assert!(db.cache_match(CACHE, "GET", "https://example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_is_scoped_to_cache_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.cache_put("countdown-app-0.9.0", "GET", "https://example.com/", &html("old"))
            .await
            .unwrap();
        assert!(db.cache_match(CACHE, "GET", "https://example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_refreshes_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/app.js", &html("one")).await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/app.js", &html("two")).await.unwrap();

        assert_eq!(db.cache_len(CACHE).await.unwrap(), 1);
        let entry = db.cache_match(CACHE, "GET", "https://example.com/app.js").await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"two");
    }

    #[tokio::test]
    async fn test_delete_cache_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/a", &html("a")).await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/b", &html("b")).await.unwrap();

        assert!(db.delete_cache(CACHE).await.unwrap());
        assert!(!db.has_cache(CACHE).await.unwrap());
        assert_eq!(db.cache_len(CACHE).await.unwrap(), 0);
        assert!(!db.delete_cache(CACHE).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_report_date_header() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let dated = html("a").with_header("Date", "Wed, 01 Jan 2025 00:00:00 GMT");
        db.cache_put(CACHE, "GET", "https://example.com/a", &dated).await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/b", &html("b")).await.unwrap();

        let keys = db.cache_keys(CACHE).await.unwrap();
        assert_eq!(keys.len(), 2);

        let a = keys.iter().find(|k| k.url.ends_with("/a")).unwrap();
        assert_eq!(a.timestamp().to_rfc3339(), "2025-01-01T00:00:00+00:00");

        let b = keys.iter().find(|k| k.url.ends_with("/b")).unwrap();
        assert!(b.date_header.is_none());
        assert_eq!(b.timestamp(), b.stored_at);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.cache_put(CACHE, "GET", "https://example.com/a", &html("a")).await.unwrap();
        let key = request_key("GET", "https://example.com/a");

        assert!(db.cache_delete(CACHE, &key).await.unwrap());
        assert!(!db.cache_delete(CACHE, &key).await.unwrap());
        assert_eq!(db.cache_len(CACHE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_names() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_cache("countdown-app-0.9.0").await.unwrap();
        db.open_cache(CACHE).await.unwrap();
        db.open_cache(CACHE).await.unwrap();

        let names = db.cache_names().await.unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&CACHE.to_string()));
    }
}
