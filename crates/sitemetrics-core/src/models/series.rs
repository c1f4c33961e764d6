//! Ordered per-period result series (the composite container)
//!
//! A [`MetricSeries`] maps sub-period labels to payloads, in strictly
//! ascending sub-period start order, with per-entry metadata queryable by
//! label. It is built once by the engine and never mutated after return.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::site::SiteId;

/// Metadata attached to each series entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryMeta {
    pub timestamp: DateTime<Utc>,
    pub site: SiteId,
}

/// One labeled entry of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesEntry<T> {
    pub label: String,
    pub payload: T,
    pub meta: EntryMeta,
}

/// Ordered mapping `label -> payload` with per-entry metadata
///
/// Insertion order equals ascending sub-period start order; the set of labels
/// equals exactly the sub-periods resolved for the request, placeholders
/// included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries<T> {
    entries: Vec<SeriesEntry<T>>,
}

impl<T> MetricSeries<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, label: String, payload: T, meta: EntryMeta) {
        self.entries.push(SeriesEntry {
            label,
            payload,
            meta,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SeriesEntry<T>] {
        &self.entries
    }

    /// Payload for a sub-period label.
    pub fn get(&self, label: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.payload)
    }

    /// Metadata for a sub-period label.
    pub fn meta(&self, label: &str) -> Option<&EntryMeta> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.meta)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|e| (e.label.as_str(), &e.payload))
    }
}

impl<'a, T> IntoIterator for &'a MetricSeries<T> {
    type Item = &'a SeriesEntry<T>;
    type IntoIter = std::slice::Iter<'a, SeriesEntry<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(secs: i64) -> EntryMeta {
        EntryMeta {
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            site: SiteId(1),
        }
    }

    #[test]
    fn test_series_preserves_insertion_order() {
        let mut series = MetricSeries::with_capacity(2);
        series.push("2024-01-01".to_string(), 10u64, meta(0));
        series.push("2024-01-02".to_string(), 20u64, meta(86_400));

        let labels: Vec<_> = series.labels().collect();
        assert_eq!(labels, ["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_series_query_by_label() {
        let mut series = MetricSeries::with_capacity(1);
        series.push("2024-01-01".to_string(), 10u64, meta(0));

        assert_eq!(series.get("2024-01-01"), Some(&10));
        assert_eq!(series.get("2024-01-02"), None);
        assert_eq!(series.meta("2024-01-01").unwrap().site, SiteId(1));
    }
}
