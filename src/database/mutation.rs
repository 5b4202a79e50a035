// Write construction
//
// Turns a sparse `FieldSet` into a store write. Columns are emitted in
// schema field order, never input order, so placeholder numbering is
// deterministic for a given set of supplied fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::record::{FieldSet, Patch};
use super::schema::{FieldSpec, ResourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update { id: i64 },
}

/// A fully formed write: column assignments plus the equivalent SQL
#[derive(Debug, Clone, PartialEq)]
pub struct WriteInstruction {
    pub table: &'static str,
    pub kind: WriteKind,
    /// Columns written, in placeholder order. Includes the timestamp touch.
    pub assignments: Vec<(&'static str, Value)>,
    /// Statement with `$1..$n` placeholders, without a RETURNING clause
    pub sql: String,
    /// Bound values for `sql`; for updates the record id is last
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("No fields provided for update")]
    NothingToChange,
}

pub fn timestamp_value(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn placeholder(index: usize, cast: Option<&str>) -> String {
    match cast {
        Some(cast) => format!("${}::{}", index, cast),
        None => format!("${}", index),
    }
}

/// Build the minimal UPDATE for the supplied fields of one record.
///
/// Absent fields are skipped, cleared fields are written as NULL and the
/// touch column is appended whenever anything changes. An empty field set
/// is `NothingToChange` rather than a no-op write.
pub fn build_update(
    schema: &'static ResourceSchema,
    id: i64,
    fields: &FieldSet,
    now: DateTime<Utc>,
) -> Result<WriteInstruction, MutationError> {
    let mut columns: Vec<(&'static FieldSpec, Value)> = Vec::new();
    for spec in schema.fields {
        match fields.get(spec.name) {
            Patch::Absent => {}
            Patch::Clear => columns.push((spec, Value::Null)),
            Patch::Set(value) => columns.push((spec, value.clone())),
        }
    }

    if columns.is_empty() {
        return Err(MutationError::NothingToChange);
    }

    let mut set_clauses = Vec::with_capacity(columns.len() + 1);
    let mut assignments = Vec::with_capacity(columns.len() + 1);
    for (i, (spec, value)) in columns.into_iter().enumerate() {
        set_clauses.push(format!("{} = {}", quote_identifier(spec.name), placeholder(i + 1, spec.sql_cast())));
        assignments.push((spec.name, value));
    }

    let touch_index = assignments.len() + 1;
    set_clauses.push(format!(
        "{} = {}",
        quote_identifier(schema.touch_column),
        placeholder(touch_index, Some("timestamptz"))
    ));
    assignments.push((schema.touch_column, timestamp_value(now)));

    let sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = ${}",
        quote_identifier(schema.table),
        set_clauses.join(", "),
        touch_index + 1
    );

    let mut params: Vec<Value> = assignments.iter().map(|(_, v)| v.clone()).collect();
    params.push(Value::from(id));

    tracing::debug!("Built update for {} #{}: {}", schema.table, id, sql);

    Ok(WriteInstruction {
        table: schema.table,
        kind: WriteKind::Update { id },
        assignments,
        sql,
        params,
    })
}

/// Build the INSERT for a new record.
///
/// Every schema field is written: supplied values as given, absent fields
/// with their schema default or NULL. Creation and touch timestamps share
/// the same instant.
pub fn build_insert(schema: &'static ResourceSchema, fields: &FieldSet, now: DateTime<Utc>) -> WriteInstruction {
    let mut assignments: Vec<(&'static str, Value)> = Vec::with_capacity(schema.fields.len() + 2);
    let mut placeholders = Vec::with_capacity(schema.fields.len() + 2);

    for spec in schema.fields {
        let value = match fields.get(spec.name) {
            Patch::Set(value) => value.clone(),
            Patch::Absent | Patch::Clear => ResourceSchema::default_value(spec).unwrap_or(Value::Null),
        };
        assignments.push((spec.name, value));
        placeholders.push(placeholder(assignments.len(), spec.sql_cast()));
    }

    for column in [schema.created_column, schema.touch_column] {
        assignments.push((column, timestamp_value(now)));
        placeholders.push(placeholder(assignments.len(), Some("timestamptz")));
    }

    let columns: Vec<String> = assignments.iter().map(|(c, _)| quote_identifier(c)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(schema.table),
        columns.join(", "),
        placeholders.join(", ")
    );
    let params = assignments.iter().map(|(_, v)| v.clone()).collect();

    WriteInstruction {
        table: schema.table,
        kind: WriteKind::Insert,
        assignments,
        sql,
        params,
    }
}
