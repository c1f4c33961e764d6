//! In-memory storage executor
//!
//! Rows are held per location; every call is counted so tests can assert the
//! planner's one-query-per-location behavior. Locations can be marked
//! unreachable to exercise the storage failure path.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::archive::handle::ArchiveId;
use crate::error::CoreError;
use crate::storage::executor::{ScalarRow, StorageExecutor};

/// In-memory scalar storage, one row set per location
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    rows: RwLock<HashMap<String, Vec<ScalarRow>>>,
    fail_locations: RwLock<HashSet<String>>,
    queries: AtomicUsize,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: impl Into<String>, row: ScalarRow) {
        self.rows.write().entry(location.into()).or_default().push(row);
    }

    pub fn insert_scalar(
        &self,
        location: impl Into<String>,
        archive_id: ArchiveId,
        name: impl Into<String>,
        timestamp: DateTime<Utc>,
        value: f64,
    ) {
        self.insert(
            location,
            ScalarRow {
                value,
                name: name.into(),
                archive_id,
                timestamp,
            },
        );
    }

    /// Make subsequent queries against `location` fail.
    pub fn fail_location(&self, location: impl Into<String>) {
        self.fail_locations.write().insert(location.into());
    }

    /// Number of batch queries issued so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl StorageExecutor for MemoryExecutor {
    fn query_scalar_batch(
        &self,
        location: &str,
        archive_ids: &[ArchiveId],
        names: &[&str],
    ) -> impl Future<Output = Result<Vec<ScalarRow>, CoreError>> + Send {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let result = if self.fail_locations.read().contains(location) {
            Err(CoreError::storage(location, "location unreachable"))
        } else if archive_ids.is_empty() || names.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(self
                .rows
                .read()
                .get(location)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| {
                            archive_ids.contains(&row.archive_id)
                                && names.contains(&row.name.as_str())
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        };
        async move { result }
    }
}
