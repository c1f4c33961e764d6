//! Batch query planning and empty-row synthesis
//!
//! Fetching the same scalar fields across N sub-periods one by one would cost
//! one query per sub-period. Sub-periods map to a small number of physical
//! storage locations, so all archive ids sharing a location are fetched in a
//! single query. The synthesizer then guarantees every requested sub-period
//! appears in the output, data or not.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::archive::handle::{ArchiveHandle, ArchiveId};
use crate::models::{EntryMeta, MetricSeries, Record};
use crate::storage::ScalarRow;

/// Archive ids to fetch, grouped by storage location
///
/// Group order is deterministic (locations sorted), so the merge below is
/// reproducible run to run.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BatchPlan {
    pub groups: BTreeMap<String, Vec<ArchiveId>>,
}

impl BatchPlan {
    pub fn query_count(&self) -> usize {
        self.groups.len()
    }
}

/// Group visited archives by their storage location.
///
/// Sub-periods without visits contribute no rows and are skipped here; the
/// synthesizer covers them with empty payloads.
pub(crate) fn plan_batch<H: ArchiveHandle>(handles: &[H]) -> BatchPlan {
    let mut groups: BTreeMap<String, Vec<ArchiveId>> = BTreeMap::new();
    for handle in handles {
        if !handle.has_visits() {
            continue;
        }
        groups
            .entry(handle.storage_location().to_string())
            .or_default()
            .push(handle.id());
    }
    let plan = BatchPlan { groups };
    debug!(
        locations = plan.query_count(),
        "Planned scalar batch retrieval"
    );
    plan
}

/// Merge per-location result sets into `timestamp -> (field -> value)`.
///
/// Duplicate `(timestamp, field)` pairs should not occur under correct
/// storage invariants; if they do, the later row in retrieval order wins.
/// Last-write-wins is deliberate and deterministic, not an error.
pub(crate) fn merge_rows(
    results: Vec<Vec<ScalarRow>>,
) -> HashMap<DateTime<Utc>, BTreeMap<String, f64>> {
    let mut merged: HashMap<DateTime<Utc>, BTreeMap<String, f64>> = HashMap::new();
    for rows in results {
        for row in rows {
            merged
                .entry(row.timestamp)
                .or_default()
                .insert(row.name, row.value);
        }
    }
    merged
}

/// Build the final series: one entry per handle in ascending start order,
/// pre-populated empty and overwritten where merged values exist.
pub(crate) fn synthesize_series<H: ArchiveHandle>(
    handles: &[H],
    merged: &HashMap<DateTime<Utc>, BTreeMap<String, f64>>,
) -> MetricSeries<Record> {
    let mut series = MetricSeries::with_capacity(handles.len());
    for handle in handles {
        // Fresh empty payload per sub-period; never a shared prototype.
        let mut record = Record::default();
        if let Some(fields) = merged.get(&handle.start()) {
            for (name, value) in fields {
                record.insert(name.clone(), *value);
            }
        }
        series.push(
            handle.label().to_string(),
            record,
            EntryMeta {
                timestamp: handle.start(),
                site: handle.site(),
            },
        );
    }
    series
}
