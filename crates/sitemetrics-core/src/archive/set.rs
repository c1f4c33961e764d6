//! The aggregation engine
//!
//! An [`ArchiveSet`] holds one prepared archive handle per sub-period of a
//! requested range, sorted ascending by start timestamp, plus an injected
//! storage executor. Retrieval operations walk the sorted handles and always
//! produce one series entry per sub-period, synthesizing empty payloads where
//! no data was recorded.

use tokio::sync::Semaphore;
use tracing::debug;

use crate::archive::batch::{merge_rows, plan_batch, synthesize_series};
use crate::archive::handle::{ArchiveHandle, ArchiveProvider};
use crate::error::CoreError;
use crate::models::{
    DataTable, DateRange, EntryMeta, Granularity, MetricSeries, MetricValue, PeriodResolver,
    Record, Site, TableId, TableRegistry,
};
use crate::storage::StorageExecutor;

/// Tuning knobs for archive-set loading
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Maximum archive preparations in flight during load
    pub max_concurrent_prepares: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_prepares: 8,
        }
    }
}

/// Expanded table series plus the registry its sub-tables live in
///
/// Sub-tables stay addressable by id for as long as this result is held.
#[derive(Debug)]
pub struct ExpandedSeries {
    pub series: MetricSeries<DataTable>,
    pub registry: TableRegistry,
}

/// Prepared archives for every sub-period of one request
///
/// Immutable after [`load`](Self::load); every retrieval operation returns a
/// freshly built series and repeated calls over static data yield identical
/// results.
#[derive(Debug)]
pub struct ArchiveSet<H, S> {
    site: Site,
    granularity: Granularity,
    /// Ascending by `start()`; stable with respect to resolver order on ties.
    handles: Vec<H>,
    executor: S,
}

impl<H, S> ArchiveSet<H, S>
where
    H: ArchiveHandle,
    S: StorageExecutor,
{
    /// Resolve sub-periods and prepare one archive per sub-period.
    ///
    /// Preparations run concurrently (bounded by
    /// [`AggregationConfig::max_concurrent_prepares`]) and are joined before
    /// returning; the first failure aborts the whole load and in-flight
    /// results are discarded. All-or-nothing: a series with silent gaps would
    /// be misleading.
    pub async fn load<P, R>(
        site: Site,
        granularity: Granularity,
        range: DateRange,
        resolver: &R,
        provider: &P,
        executor: S,
        config: AggregationConfig,
    ) -> Result<Self, CoreError>
    where
        P: ArchiveProvider<Handle = H>,
        R: PeriodResolver + ?Sized,
    {
        let sub_periods = resolver.resolve(granularity, &range)?;
        debug!(
            site = %site.id,
            granularity = %granularity,
            sub_periods = sub_periods.len(),
            "Loading archive set"
        );

        let semaphore = Semaphore::new(config.max_concurrent_prepares.max(1));
        let prepares = sub_periods.iter().map(|sub_period| {
            let semaphore = &semaphore;
            let site = &site;
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                provider.prepare(site, granularity, sub_period).await
            }
        });
        let mut handles = futures::future::try_join_all(prepares).await?;

        // Resolver output is already chronological; sort defensively. Stable,
        // so resolver order survives equal start timestamps.
        handles.sort_by_key(|h| h.start());

        debug!(archives = handles.len(), "Archive set loaded");
        Ok(Self {
            site,
            granularity,
            handles,
            executor,
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Number of sub-periods in the set.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|h| h.label())
    }

    /// Named scalar metric, one single-field payload per sub-period.
    ///
    /// The value is already resolved per handle, so no batching applies here;
    /// an absent field yields an empty payload, never an error.
    pub fn numeric(&self, name: &str) -> MetricSeries<Record> {
        self.build_series(|handle| match handle.get_scalar(name) {
            Some(value) => Record::single(name, value),
            None => Record::default(),
        })
    }

    /// Named opaque metric, wrapped as `{"blob": value}` per sub-period.
    pub fn blob(&self, name: &str) -> MetricSeries<Record> {
        self.build_series(|handle| match handle.get_opaque(name) {
            Some(value) => Record::single("blob", MetricValue::Opaque(value)),
            None => Record::default(),
        })
    }

    /// Named hierarchical table per sub-period, root level only.
    pub fn table(&self, name: &str, sub_table: Option<TableId>) -> MetricSeries<DataTable> {
        self.build_series(|handle| handle.get_table(name, sub_table).unwrap_or_default())
    }

    /// Named hierarchical table per sub-period with all nested sub-tables
    /// materialized and registered by id for the lifetime of the result.
    pub fn table_expanded(&self, name: &str, sub_table: Option<TableId>) -> ExpandedSeries {
        let registry = TableRegistry::new();
        let series = self.build_series(|handle| {
            let mut table = handle.get_table_expanded(name, sub_table).unwrap_or_default();
            registry.index_subtables(&mut table);
            table
        });
        ExpandedSeries { series, registry }
    }

    /// Batched multi-field scalar retrieval.
    ///
    /// Groups visited archives by storage location, issues exactly one query
    /// per distinct location (concurrently; completion order is irrelevant
    /// because the merge is keyed by timestamp and field), and synthesizes
    /// empty payloads for sub-periods without rows.
    pub async fn numeric_batch(&self, names: &[&str]) -> Result<MetricSeries<Record>, CoreError> {
        let plan = plan_batch(&self.handles);
        debug!(
            locations = plan.query_count(),
            fields = names.len(),
            "Dispatching scalar batch queries"
        );

        let queries = plan
            .groups
            .iter()
            .map(|(location, ids)| self.executor.query_scalar_batch(location, ids, names));
        let results = futures::future::try_join_all(queries).await?;

        let merged = merge_rows(results);
        Ok(synthesize_series(&self.handles, &merged))
    }

    /// Walk handles in ascending start order and build a series with one
    /// entry per sub-period.
    fn build_series<T>(&self, mut payload_for: impl FnMut(&H) -> T) -> MetricSeries<T> {
        let mut series = MetricSeries::with_capacity(self.handles.len());
        for handle in &self.handles {
            series.push(
                handle.label().to_string(),
                payload_for(handle),
                EntryMeta {
                    timestamp: handle.start(),
                    site: handle.site(),
                },
            );
        }
        series
    }
}
