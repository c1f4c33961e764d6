//! Storage executor contract
//!
//! The engine never talks to physical storage directly; it is handed an
//! executor at construction (no process-wide singletons) and issues one
//! batched query per distinct storage location.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

use crate::archive::handle::ArchiveId;
use crate::error::CoreError;

/// One numeric row returned by a batched scalar query
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRow {
    pub value: f64,
    pub name: String,
    pub archive_id: ArchiveId,
    /// Start timestamp of the sub-period the row belongs to.
    pub timestamp: DateTime<Utc>,
}

/// Batched scalar retrieval against one physical storage location
///
/// Returns every `(value, name, archive id, timestamp)` row where the archive
/// id is in `archive_ids` and the field name is in `names`. An empty id or
/// name list yields an empty result without touching storage. Transport
/// failures surface as [`CoreError::StorageUnavailable`]; retries, if any,
/// belong to the implementation behind this trait.
pub trait StorageExecutor: Send + Sync {
    fn query_scalar_batch(
        &self,
        location: &str,
        archive_ids: &[ArchiveId],
        names: &[&str],
    ) -> impl Future<Output = Result<Vec<ScalarRow>, CoreError>> + Send;
}

impl<S: StorageExecutor> StorageExecutor for Arc<S> {
    fn query_scalar_batch(
        &self,
        location: &str,
        archive_ids: &[ArchiveId],
        names: &[&str],
    ) -> impl Future<Output = Result<Vec<ScalarRow>, CoreError>> + Send {
        (**self).query_scalar_batch(location, archive_ids, names)
    }
}
