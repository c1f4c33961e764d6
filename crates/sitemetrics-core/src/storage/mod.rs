//! Physical storage executors

pub mod executor;
pub mod memory;
pub mod sqlite;

pub use executor::{ScalarRow, StorageExecutor};
pub use memory::MemoryExecutor;
pub use sqlite::SqliteExecutor;
