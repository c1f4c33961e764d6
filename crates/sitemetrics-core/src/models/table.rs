//! Hierarchical tables and the expanded-table registry
//!
//! A [`DataTable`] is a list of labeled rows, each carrying numeric columns
//! and optionally a nested sub-table. Lazy reads return only the root level;
//! expanded reads materialize the whole tree and register every sub-table in
//! a [`TableRegistry`] so it stays addressable by id for the lifetime of the
//! result.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of a registered sub-table
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One labeled row of a hierarchical table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub label: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtable_id: Option<TableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtable: Option<Box<DataTable>>,
}

impl Row {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_subtable(mut self, subtable: DataTable) -> Self {
        self.subtable = Some(Box::new(subtable));
        self
    }
}

/// Hierarchical table of labeled rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    rows: Vec<Row>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn row(&self, label: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Root level only: rows with their nested sub-tables stripped.
    pub fn without_subtables(&self) -> DataTable {
        DataTable {
            rows: self
                .rows
                .iter()
                .map(|row| Row {
                    label: row.label.clone(),
                    metrics: row.metrics.clone(),
                    subtable_id: None,
                    subtable: None,
                })
                .collect(),
        }
    }
}

/// Registry of materialized sub-tables, addressable by id
///
/// Populated during expanded table retrieval; lives as long as the result it
/// was built for. Ids are assigned in depth-first order starting at 1.
#[derive(Debug, Default)]
pub struct TableRegistry {
    next_id: AtomicU64,
    tables: DashMap<TableId, Arc<DataTable>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one table and return its id.
    pub fn register(&self, table: DataTable) -> TableId {
        let id = TableId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.tables.insert(id, Arc::new(table));
        id
    }

    pub fn get(&self, id: TableId) -> Option<Arc<DataTable>> {
        self.tables.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Recursively register every nested sub-table of `table`, assigning
    /// each row's `subtable_id`. Children are registered before parents so a
    /// registered table already carries the ids of its own children.
    pub fn index_subtables(&self, table: &mut DataTable) {
        for row in table.rows_mut() {
            if let Some(subtable) = row.subtable.as_deref_mut() {
                self.index_subtables(subtable);
                row.subtable_id = Some(self.register(subtable.clone()));
            }
        }
    }
}
