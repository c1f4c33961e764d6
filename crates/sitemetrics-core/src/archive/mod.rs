//! Archive handles, providers, and the aggregation engine

pub mod batch;
pub mod handle;
pub mod memory;
pub mod set;

pub use handle::{ArchiveHandle, ArchiveId, ArchiveProvider};
pub use memory::{MemoryArchive, MemoryProvider};
pub use set::{AggregationConfig, ArchiveSet, ExpandedSeries};
