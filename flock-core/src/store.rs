use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::record::Row;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error reported by a record store.
///
/// `code` is the backend's machine-checkable code (PostgREST / Postgres
/// codes for hosted Postgres backends), `message` the human-readable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code<S: Into<String>>(mut self, code: S) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Column missing from the table's schema cache.
    pub fn undefined_column(table: &str, column: &str) -> Self {
        Self::new(format!(
            "Could not find the '{column}' column of '{table}' in the schema cache"
        ))
        .with_code(codes::COLUMN_NOT_IN_SCHEMA_CACHE)
    }

    pub fn undefined_table(table: &str) -> Self {
        Self::new(format!("relation \"public.{table}\" does not exist"))
            .with_code(codes::UNDEFINED_TABLE)
    }

    pub fn row_not_found(table: &str, id: &str) -> Self {
        Self::new(format!("no row with id '{id}' in '{table}'"))
            .with_code(codes::NO_ROWS)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

/// Backend error codes flock knows how to interpret.
pub mod codes {
    /// PostgREST: column not found in the schema cache
    pub const COLUMN_NOT_IN_SCHEMA_CACHE: &str = "PGRST204";
    /// Postgres: undefined_column
    pub const UNDEFINED_COLUMN: &str = "42703";
    /// Postgres: undefined_table
    pub const UNDEFINED_TABLE: &str = "42P01";
    /// PostgREST: zero rows where exactly one was expected
    pub const NO_ROWS: &str = "PGRST116";
}

/// Equality filter over columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq<K: Into<String>, V: Into<Value>>(mut self, column: K, value: V) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc<S: Into<String>>(column: S) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Compare two rows on this order's column. Missing and null values sort last
    /// in either direction.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let left = a.get(&self.column).filter(|v| !v.is_null());
        let right = b.get(&self.column).filter(|v| !v.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = compare_values(l, r);
                if self.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Structured record store collaborator.
///
/// Mirrors the hosted backend's table API: insert/update return the store's
/// confirmed representation of the row.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row>;

    async fn update(&self, table: &str, id: &str, row: Row) -> StoreResult<Row>;

    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Row>>;

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, row: Row) -> StoreResult<Row> {
        (**self).update(table, id, row).await
    }

    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> StoreResult<Vec<Row>> {
        (**self).select(table, filter, order).await
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        (**self).delete(table, id).await
    }
}
