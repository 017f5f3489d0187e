//! Persistence contract used to mirror the version table.
//!
//! Rows are plain JSON objects keyed by a `name` column.  The host only needs
//! the handful of operations below; anything richer belongs to the backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::error::{PersistenceError, PersistenceResult};

/// One persisted row.
pub type Row = Value;

/// Key-value table storage.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Human-readable backend name for log lines.
    fn name(&self) -> &str;

    /// Creates `table` if it does not exist.
    async fn ensure_table(&self, table: &str) -> PersistenceResult<()>;

    /// Removes every row from `table`.
    async fn truncate(&self, table: &str) -> PersistenceResult<()>;

    /// Inserts `row` under `key` unless a row with that key already exists.
    ///
    /// Returns `true` if the row was inserted.  An existing row is left
    /// untouched.
    async fn upsert_if_absent(&self, table: &str, key: &str, row: Row) -> PersistenceResult<bool>;

    /// Deletes the row stored under `key`.  Returns `true` if one existed.
    async fn delete_where(&self, table: &str, key: &str) -> PersistenceResult<bool>;

    /// Returns the row stored under `key`.
    async fn find_where(&self, table: &str, key: &str) -> PersistenceResult<Option<Row>>;

    /// Returns every row of `table` in insertion order.
    async fn list_all(&self, table: &str) -> PersistenceResult<Vec<Row>>;
}

// ─── MemoryBackend ───────────────────────────────────────────────────────────

/// In-process backend.  Useful for tests and for hosts without a database.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<(String, Row)>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `table` has been provisioned.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut Vec<(String, Row)>) -> T,
    ) -> PersistenceResult<T> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| PersistenceError::MissingTable(table.to_string()))?;
        Ok(f(rows))
    }
}

#[async_trait]
impl PersistenceBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_table(&self, table: &str) -> PersistenceResult<()> {
        self.tables.write().entry(table.to_string()).or_default();
        Ok(())
    }

    async fn truncate(&self, table: &str) -> PersistenceResult<()> {
        self.with_table(table, Vec::clear)
    }

    async fn upsert_if_absent(&self, table: &str, key: &str, row: Row) -> PersistenceResult<bool> {
        self.with_table(table, |rows| {
            if rows.iter().any(|(k, _)| k == key) {
                trace!(table, key, "Row exists, leaving it untouched");
                false
            } else {
                rows.push((key.to_string(), row));
                true
            }
        })
    }

    async fn delete_where(&self, table: &str, key: &str) -> PersistenceResult<bool> {
        self.with_table(table, |rows| {
            let before = rows.len();
            rows.retain(|(k, _)| k != key);
            rows.len() != before
        })
    }

    async fn find_where(&self, table: &str, key: &str) -> PersistenceResult<Option<Row>> {
        self.with_table(table, |rows| {
            rows.iter()
                .find(|(k, _)| k == key)
                .map(|(_, row)| row.clone())
        })
    }

    async fn list_all(&self, table: &str) -> PersistenceResult<Vec<Row>> {
        self.with_table(table, |rows| rows.iter().map(|(_, row)| row.clone()).collect())
    }
}
