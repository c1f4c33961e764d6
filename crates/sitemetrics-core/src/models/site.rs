//! Site identity
//!
//! Archives are always aggregated for a single site; the engine carries the
//! site through to every entry's metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric site identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
}

impl Site {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: SiteId(id),
            name: name.into(),
        }
    }
}
