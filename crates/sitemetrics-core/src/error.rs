//! Error types for sitemetrics-core
//!
//! All fatal conditions abort the whole aggregation call; a partial series
//! is never returned. Absence of a metric is not an error and is represented
//! as `None` / empty payloads by the callers.

use thiserror::Error;

use crate::models::{Granularity, SiteId};

/// Core error type for aggregation operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed period/date combination handed to the resolver.
    #[error("invalid {granularity} period over {range}: {reason}")]
    InvalidPeriod {
        granularity: Granularity,
        range: String,
        reason: String,
    },

    /// A sub-period archive could not be prepared. Fatal to the whole
    /// aggregation: a time series with silent gaps would be misleading.
    #[error("archive unavailable for site {site} at {period}: {reason}")]
    ArchiveUnavailable {
        site: SiteId,
        period: String,
        reason: String,
    },

    /// A storage location could not be queried. Retry policy, if any,
    /// belongs to the storage executor, not this crate.
    #[error("storage location '{location}' unavailable: {message}")]
    StorageUnavailable {
        location: String,
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },
}

impl CoreError {
    /// Storage failure without an underlying driver error.
    pub(crate) fn storage(location: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::StorageUnavailable {
            location: location.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Storage failure caused by the SQLite driver.
    pub(crate) fn sqlite(location: impl Into<String>, source: rusqlite::Error) -> Self {
        CoreError::StorageUnavailable {
            location: location.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}
