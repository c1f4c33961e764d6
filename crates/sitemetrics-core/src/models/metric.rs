//! Metric values and the flat per-period record
//!
//! A metric value is a tagged union: numeric scalars live in the numeric
//! archive partitions, opaque blobs carry any serializable structure, and
//! hierarchical tables are full [`DataTable`] trees. The engine never
//! interprets a value; it only wraps and unwraps it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::table::DataTable;

/// A single stored metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Table(DataTable),
    Opaque(serde_json::Value),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&serde_json::Value> {
        match self {
            MetricValue::Opaque(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&DataTable> {
        match self {
            MetricValue::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Numeric(value)
    }
}

impl From<serde_json::Value> for MetricValue {
    fn from(value: serde_json::Value) -> Self {
        MetricValue::Opaque(value)
    }
}

impl From<DataTable> for MetricValue {
    fn from(table: DataTable) -> Self {
        MetricValue::Table(table)
    }
}

/// Flat, ordered field map: the per-period payload for scalar and blob reads
///
/// `Record::default()` is the canonical empty payload. It is structurally
/// identical to a populated record, so callers never special-case emptiness.
/// Every sub-period gets a fresh instance; instances are fully independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    fields: BTreeMap<String, MetricValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record holding exactly one field.
    pub fn single(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        let mut record = Self::new();
        record.insert(name, value);
        record
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<MetricValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.fields.get(name)
    }

    /// Numeric field accessor; `None` for absent or non-numeric fields.
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_single_field() {
        let record = Record::single("nb_visits", 5.0);
        assert_eq!(record.len(), 1);
        assert_eq!(record.numeric("nb_visits"), Some(5.0));
        assert_eq!(record.numeric("missing"), None);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = Record::single("nb_visits", 5.0);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"nb_visits": 5.0})
        );
    }

    #[test]
    fn test_empty_record_is_default_shape() {
        let empty = Record::default();
        assert!(empty.is_empty());
        assert_eq!(serde_json::to_value(&empty).unwrap(), json!({}));
    }

    #[test]
    fn test_records_are_independent() {
        let mut a = Record::default();
        let b = Record::default();
        a.insert("x", 1.0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_opaque_value_round_trip() {
        let blob = json!({"keywords": ["a", "b"], "count": 2});
        let record = Record::single("blob", blob.clone());
        assert_eq!(record.get("blob").unwrap().as_opaque(), Some(&blob));
        assert_eq!(record.numeric("blob"), None);
    }

    #[test]
    fn test_metric_value_serializes_untagged() {
        assert_eq!(
            serde_json::to_value(MetricValue::Numeric(7.0)).unwrap(),
            json!(7.0)
        );
    }
}
