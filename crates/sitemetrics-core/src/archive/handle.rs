//! Archive handle and provider contracts
//!
//! An archive is a persisted, pre-computed metric set for one site and one
//! sub-period, prepared by an external archiving process. The engine depends
//! only on these traits; one concrete handle per period granularity is fine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

use crate::error::CoreError;
use crate::models::{DataTable, Granularity, Site, SiteId, SubPeriod, TableId};

/// Identifier of one persisted archive
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ArchiveId(pub u64);

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read capabilities of one prepared sub-period archive
///
/// Read operations never fail for absence: a missing field or table is
/// `None`, which the engine turns into an empty payload. `storage_location`
/// names the physical partition holding this archive's numeric rows; distinct
/// sub-periods may share or differ in location.
pub trait ArchiveHandle: Send + Sync {
    fn id(&self) -> ArchiveId;
    fn site(&self) -> SiteId;
    /// Sub-period start; the ordering key for every result series.
    fn start(&self) -> DateTime<Utc>;
    /// Human-readable sub-period label used as the series key.
    fn label(&self) -> &str;
    /// Whether any data was recorded for this sub-period at all.
    fn has_visits(&self) -> bool;
    fn storage_location(&self) -> &str;

    fn get_scalar(&self, name: &str) -> Option<f64>;
    fn get_opaque(&self, name: &str) -> Option<serde_json::Value>;
    /// Root level of the named table; `sub_table` addresses a stored nested
    /// table instead of the root.
    fn get_table(&self, name: &str, sub_table: Option<TableId>) -> Option<DataTable>;
    /// Like [`get_table`](Self::get_table) but with every nested sub-table
    /// eagerly materialized inline.
    fn get_table_expanded(&self, name: &str, sub_table: Option<TableId>) -> Option<DataTable>;
}

/// Builds and prepares one archive per sub-period
///
/// `prepare` is idempotent: it ensures an up-to-date persisted metric set
/// exists (computing it if needed) and returns a handle onto it. It fails
/// with [`CoreError::ArchiveUnavailable`] when the underlying computation
/// cannot complete; a sub-period without data is not a failure and yields a
/// handle with `has_visits() == false`.
pub trait ArchiveProvider: Send + Sync {
    type Handle: ArchiveHandle;

    fn prepare(
        &self,
        site: &Site,
        granularity: Granularity,
        sub_period: &SubPeriod,
    ) -> impl Future<Output = Result<Self::Handle, CoreError>> + Send;
}
