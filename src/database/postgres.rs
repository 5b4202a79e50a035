use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::{PgArguments, PgPoolOptions}, PgPool, Row};
use std::time::Duration;
use tracing::info;

use super::models;
use super::mutation::{WriteInstruction, WriteKind};
use super::record::Record;
use super::store::{Selection, Store, StoreError};
use crate::config::DatabaseConfig;

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed store. Rows are read through `row_to_json` so every
/// backend hands the orchestrator the same `Record` shape.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect using the configured pool settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config.url.as_deref().ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool ({} max connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationError(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool (e.g., on shutdown)
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }

    fn quote_identifier(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Only tables and columns declared by a resource schema are ever
    /// interpolated into SQL.
    fn checked_table(table: &str) -> Result<&'static super::schema::ResourceSchema, StoreError> {
        models::by_table(table).ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn checked_column(table: &str, column: &str) -> Result<(), StoreError> {
        let schema = Self::checked_table(table)?;
        let known = column == "id"
            || column == schema.created_column
            || column == schema.touch_column
            || schema.field(column).is_some();
        if known {
            Ok(())
        } else {
            Err(StoreError::QueryError(format!("unknown column {}.{}", table, column)))
        }
    }

    /// Translate SQLSTATE 23505 into `UniqueViolation`, naming the column
    /// when the constraint name mentions one of the table's unique fields.
    fn map_write_error(table: &str, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let column = db.constraint().and_then(|constraint| {
                    models::by_table(table).and_then(|schema| {
                        schema
                            .unique_fields()
                            .find(|f| constraint.contains(f.name))
                            .map(|f| f.name.to_string())
                    })
                });
                return StoreError::UniqueViolation { table: table.to_string(), column };
            }
        }
        StoreError::Sqlx(err)
    }

    fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Record, StoreError> {
        let value: Value = row.try_get("row")?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::QueryError(format!("unexpected row format: {}", other))),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn fetch_by_key(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError> {
        Self::checked_table(table)?;
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} WHERE \"id\" = $1) t",
            Self::quote_identifier(table)
        );

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode_row).transpose()
    }

    async fn fetch_by_unique(&self, table: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError> {
        Self::checked_column(table, column)?;
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} WHERE {} = $1 LIMIT 1) t",
            Self::quote_identifier(table),
            Self::quote_identifier(column)
        );

        let row = bind_param(sqlx::query(&sql), value).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode_row).transpose()
    }

    async fn fetch_all(&self, table: &str, selection: Selection) -> Result<Vec<Record>, StoreError> {
        let schema = Self::checked_table(table)?;
        let order = if selection.newest_first {
            format!("{} DESC, \"id\" DESC", Self::quote_identifier(schema.created_column))
        } else {
            "\"id\" ASC".to_string()
        };

        let rows = match &selection.filter {
            Some((column, value)) => {
                Self::checked_column(table, column)?;
                let sql = format!(
                    "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} WHERE {} = $1 ORDER BY {}) t",
                    Self::quote_identifier(table),
                    Self::quote_identifier(column),
                    order
                );
                bind_param(sqlx::query(&sql), value).fetch_all(&self.pool).await?
            }
            None => {
                let sql = format!(
                    "SELECT row_to_json(t) AS row FROM (SELECT * FROM {} ORDER BY {}) t",
                    Self::quote_identifier(table),
                    order
                );
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(Self::decode_row).collect()
    }

    async fn write(&self, instruction: WriteInstruction) -> Result<Option<Record>, StoreError> {
        Self::checked_table(instruction.table)?;
        let sql = format!(
            "WITH written AS ({} RETURNING *) SELECT row_to_json(written) AS row FROM written",
            instruction.sql
        );

        let mut q = sqlx::query(&sql);
        for value in &instruction.params {
            q = bind_param(q, value);
        }

        let row = q
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(instruction.table, e))?;

        match (row, instruction.kind) {
            (Some(row), _) => Ok(Some(Self::decode_row(&row)?)),
            (None, WriteKind::Update { .. }) => Ok(None),
            (None, WriteKind::Insert) => Err(StoreError::QueryError(format!(
                "insert into {} returned no row",
                instruction.table
            ))),
        }
    }

    async fn delete(&self, table: &str, id: i64) -> Result<Option<i64>, StoreError> {
        Self::checked_table(table)?;
        let sql = format!("DELETE FROM {} WHERE \"id\" = $1 RETURNING \"id\"", Self::quote_identifier(table));

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<i64, _>("id")?)),
            None => Ok(None),
        }
    }

    /// Pings the pool to ensure connectivity
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}
