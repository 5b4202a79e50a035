use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::mutation::WriteInstruction;
use super::record::Record;

/// Errors surfaced by store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A unique constraint rejected the write. `column` is the violated
    /// column when the backend can tell.
    #[error("Unique constraint violated on {table}")]
    UniqueViolation { table: String, column: Option<String> },

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Row selection for collection reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Exact-match column filter
    pub filter: Option<(&'static str, Value)>,
    /// Order by creation time descending instead of id ascending
    pub newest_first: bool,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(column: &'static str, value: Value) -> Self {
        Self { filter: Some((column, value)), newest_first: false }
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }
}

/// Relational store seam used by the orchestrator.
///
/// Every call is a single round-trip, atomic at row granularity.
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_by_key(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError>;

    async fn fetch_by_unique(&self, table: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError>;

    async fn fetch_all(&self, table: &str, selection: Selection) -> Result<Vec<Record>, StoreError>;

    /// Apply an insert or update. `None` when an update matched no row.
    async fn write(&self, instruction: WriteInstruction) -> Result<Option<Record>, StoreError>;

    /// Delete by key, returning the deleted key when a row existed
    async fn delete(&self, table: &str, id: i64) -> Result<Option<i64>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Read the numeric `id` column of a stored record
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}
