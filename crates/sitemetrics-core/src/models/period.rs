//! Period model and sub-period resolution
//!
//! A requested date range is decomposed into contiguous sub-periods (one per
//! day, ISO week, month or year). Sub-periods are immutable once produced and
//! ordered by their start timestamp.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Sub-period granularity inside a requested range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One atomic time bucket within a requested range
///
/// Ordering key is `start`; `label` is the human-readable key under which the
/// bucket appears in result series (e.g. `2024-01-15`, `2024-W03`, `2024-01`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPeriod {
    pub start: DateTime<Utc>,
    pub label: String,
}

impl SubPeriod {
    /// Build the sub-period for the bucket starting at `bucket_start`.
    pub fn new(granularity: Granularity, bucket_start: NaiveDate) -> Self {
        let label = match granularity {
            Granularity::Day => bucket_start.format("%Y-%m-%d").to_string(),
            Granularity::Week => {
                let week = bucket_start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Granularity::Month => bucket_start.format("%Y-%m").to_string(),
            Granularity::Year => bucket_start.format("%Y").to_string(),
        };
        Self {
            start: bucket_start.and_time(NaiveTime::MIN).and_utc(),
            label,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// Decomposes a `(granularity, range)` pair into ordered sub-periods.
///
/// Never returns an empty list for a valid range; malformed inputs fail with
/// [`CoreError::InvalidPeriod`].
pub trait PeriodResolver: Send + Sync {
    fn resolve(
        &self,
        granularity: Granularity,
        range: &DateRange,
    ) -> Result<Vec<SubPeriod>, CoreError>;
}

/// Calendar-based resolver
///
/// Walks bucket starts from the bucket containing `range.start` while the
/// bucket start is on or before `range.end`. Weeks are ISO weeks (Monday
/// start), months and years start on the first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarResolver;

impl PeriodResolver for CalendarResolver {
    fn resolve(
        &self,
        granularity: Granularity,
        range: &DateRange,
    ) -> Result<Vec<SubPeriod>, CoreError> {
        if range.end < range.start {
            return Err(CoreError::InvalidPeriod {
                granularity,
                range: range.to_string(),
                reason: "end date precedes start date".to_string(),
            });
        }

        let mut sub_periods = Vec::new();
        let mut cursor = bucket_start(granularity, range.start);
        while cursor <= range.end {
            sub_periods.push(SubPeriod::new(granularity, cursor));
            cursor = bucket_start(granularity, next_bucket_probe(granularity, cursor));
        }
        Ok(sub_periods)
    }
}

/// Start of the bucket containing `date`.
fn bucket_start(granularity: Granularity, date: NaiveDate) -> NaiveDate {
    match granularity {
        Granularity::Day => date,
        Granularity::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
        Granularity::Month => date - Duration::days(date.day0() as i64),
        Granularity::Year => date - Duration::days(date.ordinal0() as i64),
    }
}

/// A date guaranteed to fall inside the bucket after the one starting at
/// `bucket`; feeding it back into `bucket_start` yields the next bucket start.
fn next_bucket_probe(granularity: Granularity, bucket: NaiveDate) -> NaiveDate {
    match granularity {
        Granularity::Day => bucket + Duration::days(1),
        Granularity::Week => bucket + Duration::days(7),
        // A month is at most 31 days and a year at most 366, so these always
        // land in the immediately following bucket.
        Granularity::Month => bucket + Duration::days(32),
        Granularity::Year => bucket + Duration::days(367),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_days_full_month() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        let subs = CalendarResolver
            .resolve(Granularity::Day, &range)
            .unwrap();

        assert_eq!(subs.len(), 31);
        assert_eq!(subs[0].label, "2024-01-01");
        assert_eq!(subs[30].label, "2024-01-31");
        assert!(subs.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn test_resolve_single_day() {
        let range = DateRange::new(date(2024, 3, 5), date(2024, 3, 5));
        let subs = CalendarResolver
            .resolve(Granularity::Day, &range)
            .unwrap();

        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].label, "2024-03-05");
    }

    #[test]
    fn test_resolve_weeks_align_to_monday() {
        // 2024-01-10 is a Wednesday; the containing ISO week starts 2024-01-08.
        let range = DateRange::new(date(2024, 1, 10), date(2024, 1, 16));
        let subs = CalendarResolver
            .resolve(Granularity::Week, &range)
            .unwrap();

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].date(), date(2024, 1, 8));
        assert_eq!(subs[0].label, "2024-W02");
        assert_eq!(subs[1].date(), date(2024, 1, 15));
        assert_eq!(subs[1].label, "2024-W03");
    }

    #[test]
    fn test_resolve_months_across_year_boundary() {
        let range = DateRange::new(date(2023, 11, 20), date(2024, 2, 3));
        let subs = CalendarResolver
            .resolve(Granularity::Month, &range)
            .unwrap();

        let labels: Vec<_> = subs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(subs[0].date(), date(2023, 11, 1));
    }

    #[test]
    fn test_resolve_years() {
        let range = DateRange::new(date(2022, 6, 1), date(2024, 1, 1));
        let subs = CalendarResolver
            .resolve(Granularity::Year, &range)
            .unwrap();

        let labels: Vec<_> = subs.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["2022", "2023", "2024"]);
    }

    #[test]
    fn test_resolve_rejects_inverted_range() {
        let range = DateRange::new(date(2024, 2, 1), date(2024, 1, 1));
        let err = CalendarResolver
            .resolve(Granularity::Day, &range)
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidPeriod { .. }));
    }

    #[test]
    fn test_leap_year_february() {
        let range = DateRange::new(date(2024, 2, 1), date(2024, 2, 29));
        let subs = CalendarResolver
            .resolve(Granularity::Day, &range)
            .unwrap();
        assert_eq!(subs.len(), 29);
    }
}
