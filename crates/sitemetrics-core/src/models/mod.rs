//! Data models for sitemetrics-core

pub mod metric;
pub mod period;
pub mod series;
pub mod site;
pub mod table;

pub use metric::{MetricValue, Record};
pub use period::{CalendarResolver, DateRange, Granularity, PeriodResolver, SubPeriod};
pub use series::{EntryMeta, MetricSeries, SeriesEntry};
pub use site::{Site, SiteId};
pub use table::{DataTable, Row, TableId, TableRegistry};
