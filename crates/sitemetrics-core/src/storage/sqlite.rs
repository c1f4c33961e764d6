//! SQLite-backed storage executor
//!
//! Numeric archive rows live in one table per storage location
//! (`archive_numeric_<location>`, e.g. `archive_numeric_2024_01` for
//! date-partitioned locations). The batched query selects all requested
//! fields for all archive ids of a location in a single statement.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ToSql};
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::archive::handle::ArchiveId;
use crate::error::CoreError;
use crate::storage::executor::{ScalarRow, StorageExecutor};

/// SQLite storage executor (thread-safe)
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open or create the archive database at `path` in WAL mode.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let location = path.display().to_string();
        let conn =
            Connection::open(path).map_err(|e| CoreError::sqlite(location.clone(), e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CoreError::sqlite(location.clone(), e))?;

        debug!(path = %location, "Archive database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CoreError::sqlite(":memory:", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Provision the partition table for a storage location.
    ///
    /// Idempotent; call once per location before inserting rows. The archiving
    /// process owns the insert path in production, tests use it directly.
    pub fn create_location(&self, location: &str) -> Result<(), CoreError> {
        let table = table_name(location)?;
        let conn = self.lock(location)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                idarchive INTEGER NOT NULL,
                name TEXT NOT NULL,
                ts_start INTEGER NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (idarchive, name)
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name);"
        ))
        .map_err(|e| CoreError::sqlite(location, e))?;
        Ok(())
    }

    /// Insert or replace one numeric row.
    pub fn insert_scalar(
        &self,
        location: &str,
        archive_id: ArchiveId,
        name: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<(), CoreError> {
        let table = table_name(location)?;
        let conn = self.lock(location)?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {table} (idarchive, name, ts_start, value)
                 VALUES (?1, ?2, ?3, ?4)"
            ),
            params![archive_id.0 as i64, name, timestamp.timestamp(), value],
        )
        .map_err(|e| CoreError::sqlite(location, e))?;
        Ok(())
    }

    fn lock(&self, location: &str) -> Result<std::sync::MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::storage(location, "connection lock poisoned"))
    }

    fn query_sync(
        &self,
        location: &str,
        archive_ids: &[ArchiveId],
        names: &[&str],
    ) -> Result<Vec<ScalarRow>, CoreError> {
        if archive_ids.is_empty() || names.is_empty() {
            return Ok(Vec::new());
        }

        let table = table_name(location)?;
        let id_marks = placeholders(archive_ids.len());
        let name_marks = placeholders(names.len());
        let sql = format!(
            "SELECT value, name, idarchive, ts_start FROM {table}
             WHERE idarchive IN ({id_marks}) AND name IN ({name_marks})"
        );

        let ids: Vec<i64> = archive_ids.iter().map(|id| id.0 as i64).collect();
        let mut bindings: Vec<&dyn ToSql> = Vec::with_capacity(ids.len() + names.len());
        for id in &ids {
            bindings.push(id);
        }
        for name in names {
            bindings.push(name);
        }

        let conn = self.lock(location)?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| CoreError::sqlite(location, e))?;
        let mut rows = stmt
            .query(bindings.as_slice())
            .map_err(|e| CoreError::sqlite(location, e))?;

        let mut out = Vec::new();
        loop {
            let row = match rows.next().map_err(|e| CoreError::sqlite(location, e))? {
                Some(row) => row,
                None => break,
            };
            let value: f64 = row.get(0).map_err(|e| CoreError::sqlite(location, e))?;
            let name: String = row.get(1).map_err(|e| CoreError::sqlite(location, e))?;
            let idarchive: i64 = row.get(2).map_err(|e| CoreError::sqlite(location, e))?;
            let ts_start: i64 = row.get(3).map_err(|e| CoreError::sqlite(location, e))?;
            let timestamp = DateTime::from_timestamp(ts_start, 0).ok_or_else(|| {
                CoreError::storage(location, format!("invalid ts_start {ts_start}"))
            })?;
            out.push(ScalarRow {
                value,
                name,
                archive_id: ArchiveId(idarchive as u64),
                timestamp,
            });
        }

        debug!(location, rows = out.len(), "Scalar batch query complete");
        Ok(out)
    }
}

impl StorageExecutor for SqliteExecutor {
    fn query_scalar_batch(
        &self,
        location: &str,
        archive_ids: &[ArchiveId],
        names: &[&str],
    ) -> impl Future<Output = Result<Vec<ScalarRow>, CoreError>> + Send {
        // SQLite work is synchronous and short; resolve eagerly so the lock
        // is never held across an await point.
        let result = self.query_sync(location, archive_ids, names);
        async move { result }
    }
}

/// Location names are interpolated into SQL, so only `[A-Za-z0-9_]` is
/// accepted.
fn table_name(location: &str) -> Result<String, CoreError> {
    if location.is_empty()
        || !location
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(CoreError::storage(location, "invalid storage location name"));
    }
    Ok(format!("archive_numeric_{location}"))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn seeded() -> SqliteExecutor {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.create_location("2024_01").unwrap();
        executor.create_location("2024_02").unwrap();
        executor
            .insert_scalar("2024_01", ArchiveId(1), "nb_visits", ts(1), 5.0)
            .unwrap();
        executor
            .insert_scalar("2024_01", ArchiveId(1), "nb_actions", ts(1), 9.0)
            .unwrap();
        executor
            .insert_scalar("2024_01", ArchiveId(2), "nb_visits", ts(2), 7.0)
            .unwrap();
        executor
            .insert_scalar("2024_02", ArchiveId(3), "nb_visits", ts(3), 11.0)
            .unwrap();
        executor
    }

    #[tokio::test]
    async fn test_batch_query_filters_by_ids_and_names() {
        let executor = seeded();
        let mut rows = executor
            .query_scalar_batch("2024_01", &[ArchiveId(1), ArchiveId(2)], &["nb_visits"])
            .await
            .unwrap();
        rows.sort_by_key(|r| r.archive_id);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, 5.0);
        assert_eq!(rows[0].timestamp, ts(1));
        assert_eq!(rows[1].value, 7.0);
    }

    #[tokio::test]
    async fn test_batch_query_multiple_names() {
        let executor = seeded();
        let rows = executor
            .query_scalar_batch("2024_01", &[ArchiveId(1)], &["nb_visits", "nb_actions"])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_locations_are_isolated() {
        let executor = seeded();
        let rows = executor
            .query_scalar_batch("2024_02", &[ArchiveId(1), ArchiveId(3)], &["nb_visits"])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 11.0);
    }

    #[tokio::test]
    async fn test_empty_inputs_skip_storage() {
        let executor = SqliteExecutor::in_memory().unwrap();
        // No table provisioned; an empty request must not touch it.
        let rows = executor
            .query_scalar_batch("2024_01", &[], &["nb_visits"])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_missing_location_is_storage_error() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let err = executor
            .query_scalar_batch("2099_01", &[ArchiveId(1)], &["nb_visits"])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_rejects_unsafe_location_name() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let err = executor
            .query_scalar_batch("2024_01; DROP TABLE x", &[ArchiveId(1)], &["nb_visits"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::StorageUnavailable { ref message, .. }
                if message.contains("invalid storage location")
        ));
    }

    #[test]
    fn test_insert_replaces_existing_row() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.create_location("loc").unwrap();
        executor
            .insert_scalar("loc", ArchiveId(1), "x", ts(1), 1.0)
            .unwrap();
        executor
            .insert_scalar("loc", ArchiveId(1), "x", ts(1), 2.0)
            .unwrap();

        let rows = executor.query_sync("loc", &[ArchiveId(1)], &["x"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, 2.0);
    }

    #[test]
    fn test_open_file_backed() {
        let dir = tempdir().unwrap();
        let executor = SqliteExecutor::open(&dir.path().join("archives.db")).unwrap();
        executor.create_location("2024_01").unwrap();
        executor
            .insert_scalar("2024_01", ArchiveId(1), "x", ts(1), 4.0)
            .unwrap();

        let rows = executor
            .query_sync("2024_01", &[ArchiveId(1)], &["x"])
            .unwrap();
        assert_eq!(rows[0].value, 4.0);
    }
}
