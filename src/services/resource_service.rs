use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ServiceError;
use super::uniqueness::check_unique;
use crate::auth::PasswordHasher;
use crate::database::{
    build_insert, build_update, FieldSet, MutationError, Patch, Record, ResourceSchema, Selection, Store, StoreError,
};
use crate::types::Actor;
use crate::validation::{self, collect, rules, FieldKind, Problems};

/// Read/validate/mutate orchestration shared by every resource.
///
/// Each operation is driven by the resource's `ResourceSchema`; nothing here
/// knows about a particular table.
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
}

impl ResourceService {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Validate and insert a new record
    pub async fn create(
        &self,
        schema: &'static ResourceSchema,
        mut fields: FieldSet,
        actor: Option<&Actor>,
    ) -> Result<Record, ServiceError> {
        fields.blank_to_clear();
        let problems = schema.fields.iter().map(|spec| {
            let required = spec.required && spec.default.is_none();
            validation::check(spec.kind, spec.name, fields.get(spec.name).value().copied(), required)
        });
        if let Some(envelope) = collect(&format!("Invalid {} input", schema.label.to_lowercase()), problems) {
            return Err(ServiceError::InvalidInput(envelope));
        }

        self.guard_unique(schema, &fields, None).await?;
        self.prepare(schema, &mut fields).await?;

        let write = build_insert(schema, &fields, Utc::now());
        let record = self
            .store
            .write(write)
            .await
            .map_err(conflict_or_store)?
            .ok_or_else(|| ServiceError::NotFound(schema.not_found_message()))?;

        info!(
            "Created {} #{} (by {})",
            schema.table,
            record.get("id").unwrap_or(&serde_json::Value::Null),
            actor_label(actor)
        );
        Ok(schema.canonical(record))
    }

    /// Read one record by its raw path identifier
    pub async fn get(&self, schema: &'static ResourceSchema, raw_id: &str) -> Result<Record, ServiceError> {
        let id = parse_id(raw_id)?;
        self.get_by_id(schema, id).await
    }

    pub async fn get_by_id(&self, schema: &'static ResourceSchema, id: i64) -> Result<Record, ServiceError> {
        let record = self.fetch_existing(schema, id).await?;
        Ok(schema.canonical(record))
    }

    /// Every record, ordered by id
    pub async fn list(&self, schema: &'static ResourceSchema) -> Result<Vec<Record>, ServiceError> {
        let rows = self.store.fetch_all(schema.table, Selection::all()).await?;
        Ok(rows.into_iter().map(|r| schema.canonical(r)).collect())
    }

    /// Records whose `column` equals `value`. The value is validated with
    /// the column's own rule first.
    pub async fn list_where(
        &self,
        schema: &'static ResourceSchema,
        column: &'static str,
        value: Value,
        newest_first: bool,
    ) -> Result<Vec<Record>, ServiceError> {
        let spec = schema
            .field(column)
            .ok_or_else(|| ServiceError::invalid(format!("{} cannot be filtered by {}", schema.label, column)))?;

        let problems = validation::check(spec.kind, spec.name, Some(&value), true);
        if let Some(envelope) = collect(&format!("Invalid {} filter", schema.label.to_lowercase()), [problems]) {
            return Err(ServiceError::InvalidInput(envelope));
        }

        let mut selection = Selection::matching(spec.name, value);
        if newest_first {
            selection = selection.newest_first();
        }

        let rows = self.store.fetch_all(schema.table, selection).await?;
        Ok(rows.into_iter().map(|r| schema.canonical(r)).collect())
    }

    /// Partial update by raw path identifier
    pub async fn update(
        &self,
        schema: &'static ResourceSchema,
        raw_id: &str,
        fields: FieldSet,
        actor: Option<&Actor>,
    ) -> Result<Record, ServiceError> {
        let id = parse_id(raw_id)?;
        self.update_by_id(schema, id, fields, actor).await
    }

    /// Partial update: only supplied fields are validated and written.
    pub async fn update_by_id(
        &self,
        schema: &'static ResourceSchema,
        id: i64,
        mut fields: FieldSet,
        actor: Option<&Actor>,
    ) -> Result<Record, ServiceError> {
        let existing = self.fetch_existing(schema, id).await?;

        fields.retain(|name| schema.field(name).map(|spec| spec.updatable).unwrap_or(false));
        fields.blank_to_clear();

        let problems: Vec<Problems> = schema
            .fields
            .iter()
            .filter(|spec| !fields.get(spec.name).is_absent())
            .map(|spec| validation::check(spec.kind, spec.name, fields.get(spec.name).value().copied(), spec.required))
            .collect();
        if let Some(envelope) = collect(&format!("Invalid {} input", schema.label.to_lowercase()), problems) {
            return Err(ServiceError::InvalidInput(envelope));
        }

        self.guard_unique(schema, &fields, Some(&existing)).await?;
        self.prepare(schema, &mut fields).await?;

        let write = build_update(schema, id, &fields, Utc::now()).map_err(|e| match e {
            MutationError::NothingToChange => ServiceError::invalid(e.to_string()),
        })?;

        let record = self
            .store
            .write(write)
            .await
            .map_err(conflict_or_store)?
            .ok_or_else(|| ServiceError::NotFound(schema.not_found_message()))?;

        info!("Updated {} #{} (by {})", schema.table, id, actor_label(actor));
        Ok(schema.canonical(record))
    }

    /// Hard delete, returning the removed id
    pub async fn delete(
        &self,
        schema: &'static ResourceSchema,
        raw_id: &str,
        actor: Option<&Actor>,
    ) -> Result<i64, ServiceError> {
        let id = parse_id(raw_id)?;
        let deleted = self
            .store
            .delete(schema.table, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(schema.not_found_message()))?;

        info!("Deleted {} #{} (by {})", schema.table, deleted, actor_label(actor));
        Ok(deleted)
    }

    async fn fetch_existing(&self, schema: &'static ResourceSchema, id: i64) -> Result<Record, ServiceError> {
        self.store
            .fetch_by_key(schema.table, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(schema.not_found_message()))
    }

    /// Run the uniqueness guard for every supplied unique field
    async fn guard_unique(
        &self,
        schema: &'static ResourceSchema,
        fields: &FieldSet,
        existing: Option<&Record>,
    ) -> Result<(), ServiceError> {
        for spec in schema.unique_fields() {
            let Patch::Set(new_value) = fields.get(spec.name) else {
                continue;
            };
            let current = existing.and_then(|r| r.get(spec.name));
            let store = &self.store;
            let conflict = check_unique(spec.name, new_value, current, |value| async move {
                store.fetch_by_unique(schema.table, spec.name, &value).await
            })
            .await?;

            if let Some(conflict) = conflict {
                debug!("Uniqueness conflict on {}.{}", schema.table, spec.name);
                return Err(ServiceError::Conflict(conflict.message()));
            }
        }
        Ok(())
    }

    /// Turn validated input into stored form: hash secrets and store prices
    /// as numbers.
    async fn prepare(&self, schema: &'static ResourceSchema, fields: &mut FieldSet) -> Result<(), ServiceError> {
        for spec in schema.fields {
            let Patch::Set(value) = fields.get(spec.name) else {
                continue;
            };
            match spec.kind {
                FieldKind::Password => {
                    let plain = value.as_str().unwrap_or_default().to_string();
                    let hashed = self.hasher.hash(plain).await?;
                    fields.set(spec.name, hashed);
                }
                FieldKind::Price => {
                    if let Some(number) = price_number(value) {
                        fields.set(spec.name, number);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<i64, ServiceError> {
    rules::identifier(raw).map_err(|problems| {
        ServiceError::InvalidInput(validation::FailureEnvelope::new("INVALID_INPUT", "Invalid id", problems))
    })
}

/// Store-level unique violations surface like guard conflicts
fn conflict_or_store(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation { column: Some(column), .. } => {
            ServiceError::Conflict(format!("{} is already in use", column))
        }
        StoreError::UniqueViolation { table, column: None } => {
            ServiceError::Conflict(format!("{} conflicts with an existing record", table))
        }
        other => ServiceError::Store(other),
    }
}

fn price_number(value: &Value) -> Option<Value> {
    let amount = rules::parse_price(value)?.normalize();
    if amount.fract().is_zero() {
        if let Some(whole) = amount.to_i64() {
            return Some(Value::from(whole));
        }
    }
    amount.to_string().parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn actor_label(actor: Option<&Actor>) -> String {
    match actor {
        Some(actor) => format!("{} #{}", actor.role, actor.id),
        None => "anonymous".to_string(),
    }
}
