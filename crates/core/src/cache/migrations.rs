//! Versioned schema migrations.
//!
//! Applied versions are recorded in `schema_version`; each pending
//! migration runs in its own transaction together with its version row.

use tokio_rusqlite::{Connection, params};

use super::Error;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "kv_store", sql: include_str!("../../migrations/001_kv_store.sql") },
    Migration { version: 2, name: "cache_storage", sql: include_str!("../../migrations/002_cache_storage.sql") },
];

/// Latest schema version this build knows about.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Bring the schema up to [`latest_version`].
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if the database was written by a newer
/// build, or the underlying SQL error if a migration fails to apply.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;
        if current > latest_version() {
            return Err(Error::MigrationFailed(format!(
                "database schema version {current} is newer than supported version {}",
                latest_version()
            )));
        }

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            tracing::info!(version = migration.version, name = migration.name, "applying storage migration");
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", migration.name, migration.version)))?;
            tx.execute(
                "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
