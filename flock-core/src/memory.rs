use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::record::Row;
use crate::store::{Filter, Order, RecordStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryTable {
    /// `None` accepts any column.
    columns: Option<BTreeSet<String>>,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn accepts(&self, column: &str) -> bool {
        column == "id"
            || self
                .columns
                .as_ref()
                .map(|c| c.contains(column))
                .unwrap_or(true)
    }

    fn unknown_column<'a>(&self, row: &'a Row) -> Option<&'a str> {
        row.keys().map(String::as_str).find(|c| !self.accepts(c))
    }
}

/// In-process record store that behaves like a hosted Postgres table API:
/// tables have a declared column set, writes naming an unknown column fail
/// with the schema-cache error, inserts assign `id` (and `created_at` when the
/// table has that column).
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    writes: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `create_table`.
    pub fn with_table(self, table: &str, columns: &[&str]) -> Self {
        self.create_table(table, columns);
        self
    }

    /// Declare a table with a fixed column set (`id` is implicit).
    pub fn create_table(&self, table: &str, columns: &[&str]) {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.tables.write().insert(
            table.to_string(),
            MemoryTable {
                columns: Some(columns),
                rows: Vec::new(),
            },
        );
    }

    /// Declare a table that accepts any column.
    pub fn create_open_table(&self, table: &str) {
        self.tables
            .write()
            .insert(table.to_string(), MemoryTable::default());
    }

    /// Simulate a migration landing.
    pub fn add_column(&self, table: &str, column: &str) {
        if let Some(t) = self.tables.write().get_mut(table) {
            if let Some(columns) = t.columns.as_mut() {
                columns.insert(column.to_string());
            }
        }
    }

    /// Insert and update attempts, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, table: &str, mut row: Row) -> StoreResult<Row> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::undefined_table(table))?;

        if let Some(column) = t.unknown_column(&row) {
            return Err(StoreError::undefined_column(table, column));
        }

        if !row.get("id").map(|v| !v.is_null()).unwrap_or(false) {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if t.accepts("created_at") && !row.contains_key("created_at") {
            row.insert(
                "created_at".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        t.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, row: Row) -> StoreResult<Row> {
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::undefined_table(table))?;

        if let Some(column) = t.unknown_column(&row) {
            return Err(StoreError::undefined_column(table, column));
        }

        let existing = t
            .rows
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| StoreError::row_not_found(table, id))?;

        for (column, value) in row {
            if column != "id" {
                existing.insert(column, value);
            }
        }
        Ok(existing.clone())
    }

    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::undefined_table(table))?;

        let mut rows: Vec<Row> = t.rows.iter().filter(|r| filter.matches(r)).cloned().collect();
        if let Some(order) = order {
            rows.sort_by(|a, b| order.compare(a, b));
        }
        Ok(rows)
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::undefined_table(table))?;
        t.rows
            .retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        Ok(())
    }
}
