//! sitemetrics-core - Core aggregation library for sitemetrics
//!
//! Assembles pre-computed per-sub-period analytics archives into ordered,
//! uniform time series: period resolution, concurrent archive preparation,
//! location-grouped batch queries, and empty-row synthesis for sparse data.

pub mod archive;
pub mod error;
pub mod models;
pub mod storage;

pub use archive::{
    AggregationConfig, ArchiveHandle, ArchiveId, ArchiveProvider, ArchiveSet, ExpandedSeries,
    MemoryArchive, MemoryProvider,
};
pub use error::CoreError;
pub use models::{
    CalendarResolver, DataTable, DateRange, EntryMeta, Granularity, MetricSeries, MetricValue,
    PeriodResolver, Record, Row, SeriesEntry, Site, SiteId, SubPeriod, TableId, TableRegistry,
};
pub use storage::{MemoryExecutor, ScalarRow, SqliteExecutor, StorageExecutor};
