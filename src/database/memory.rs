use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::models;
use super::mutation::{WriteInstruction, WriteKind};
use super::record::Record;
use super::schema::ResourceSchema;
use super::store::{record_id, Selection, Store, StoreError};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Record>,
}

/// In-process store used for local runs and the test-suite.
///
/// Applies the same unique columns the migrations declare, checked under
/// the write lock so concurrent writers see a consistent table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema(table: &str) -> Result<&'static ResourceSchema, StoreError> {
        models::by_table(table).ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn check_unique(schema: &ResourceSchema, table: &Table, candidate: &Record, own_id: Option<i64>) -> Result<(), StoreError> {
        for field in schema.unique_fields() {
            let value = match candidate.get(field.name) {
                Some(Value::Null) | None => continue,
                Some(value) => value,
            };
            let taken = table
                .rows
                .iter()
                .any(|(id, row)| Some(*id) != own_id && row.get(field.name) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    table: schema.table.to_string(),
                    column: Some(field.name.to_string()),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_by_key(&self, table: &str, id: i64) -> Result<Option<Record>, StoreError> {
        Self::schema(table)?;
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.rows.get(&id)).cloned())
    }

    async fn fetch_by_unique(&self, table: &str, column: &str, value: &Value) -> Result<Option<Record>, StoreError> {
        Self::schema(table)?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|t| t.rows.values().find(|row| row.get(column) == Some(value)))
            .cloned())
    }

    async fn fetch_all(&self, table: &str, selection: Selection) -> Result<Vec<Record>, StoreError> {
        let schema = Self::schema(table)?;
        let tables = self.tables.read().await;
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Record> = t
            .rows
            .values()
            .filter(|row| match &selection.filter {
                Some((column, value)) => row.get(*column) == Some(value),
                None => true,
            })
            .cloned()
            .collect();

        if selection.newest_first {
            // RFC 3339 UTC strings of equal precision sort chronologically
            let created = |row: &Record| row.get(schema.created_column).and_then(Value::as_str).map(str::to_owned);
            rows.sort_by(|a, b| created(b).cmp(&created(a)).then_with(|| record_id(b).cmp(&record_id(a))));
        }
        Ok(rows)
    }

    async fn write(&self, instruction: WriteInstruction) -> Result<Option<Record>, StoreError> {
        let schema = Self::schema(instruction.table)?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(schema.table).or_default();

        match instruction.kind {
            WriteKind::Insert => {
                let mut row: Record = instruction
                    .assignments
                    .into_iter()
                    .map(|(column, value)| (column.to_string(), value))
                    .collect();
                Self::check_unique(schema, table, &row, None)?;

                table.next_id += 1;
                let id = table.next_id;
                row.insert("id".to_string(), Value::from(id));
                table.rows.insert(id, row.clone());
                Ok(Some(row))
            }
            WriteKind::Update { id } => {
                let Some(existing) = table.rows.get(&id) else {
                    return Ok(None);
                };
                let mut row = existing.clone();
                for (column, value) in instruction.assignments {
                    row.insert(column.to_string(), value);
                }
                Self::check_unique(schema, table, &row, Some(id))?;

                table.rows.insert(id, row.clone());
                Ok(Some(row))
            }
        }
    }

    async fn delete(&self, table: &str, id: i64) -> Result<Option<i64>, StoreError> {
        Self::schema(table)?;
        let mut tables = self.tables.write().await;
        Ok(tables.get_mut(table).and_then(|t| t.rows.remove(&id)).map(|_| id))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ACCOUNTS, CATEGORIES};
    use crate::database::mutation::{build_insert, build_update};
    use crate::database::record::FieldSet;
    use chrono::Utc;
    use serde_json::json;

    fn fields(schema: &ResourceSchema, body: Value) -> FieldSet {
        FieldSet::from_json(schema, body).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        for name in ["Books", "Games"] {
            let write = build_insert(&CATEGORIES, &fields(&CATEGORIES, json!({"name": name})), Utc::now());
            store.write(write).await.unwrap();
        }
        let rows = store.fetch_all("categories", Selection::all()).await.unwrap();
        let ids: Vec<_> = rows.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn unique_columns_are_enforced_on_insert_and_update() {
        let store = MemoryStore::new();
        let ana = json!({"username": "ana", "email": "ana@x.com", "password": "h"});
        let bob = json!({"username": "bob", "email": "bob@x.com", "password": "h"});
        store.write(build_insert(&ACCOUNTS, &fields(&ACCOUNTS, ana.clone()), Utc::now())).await.unwrap();
        store.write(build_insert(&ACCOUNTS, &fields(&ACCOUNTS, bob), Utc::now())).await.unwrap();

        let dup = store.write(build_insert(&ACCOUNTS, &fields(&ACCOUNTS, ana), Utc::now())).await;
        assert!(matches!(dup, Err(StoreError::UniqueViolation { column: Some(ref c), .. }) if c == "username"));

        let steal = build_update(&ACCOUNTS, 2, &fields(&ACCOUNTS, json!({"email": "ana@x.com"})), Utc::now()).unwrap();
        assert!(matches!(store.write(steal).await, Err(StoreError::UniqueViolation { .. })));

        // keeping your own value is not a violation
        let same = build_update(&ACCOUNTS, 1, &fields(&ACCOUNTS, json!({"email": "ana@x.com"})), Utc::now()).unwrap();
        assert!(store.write(same).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_rows() {
        let store = MemoryStore::new();
        let write = build_update(&CATEGORIES, 999, &fields(&CATEGORIES, json!({"name": "x"})), Utc::now()).unwrap();
        assert_eq!(store.write(write).await.unwrap(), None);
        assert_eq!(store.delete("categories", 999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_tables_are_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(store.fetch_by_key("orders", 1).await, Err(StoreError::UnknownTable(_))));
    }
}
