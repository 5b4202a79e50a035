// Declarative resource schemas
//
// Each resource (account, category, product, article) is described once by
// a `ResourceSchema`. The orchestrator, the mutation builder and the stores
// are driven entirely by these descriptions.

use serde_json::Value;

use crate::validation::FieldKind;

/// Columns every table carries that API input may never set
pub const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// One writable column of a resource
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Input key and column name
    pub name: &'static str,
    pub kind: FieldKind,
    /// Must be present and non-blank on create; may not be cleared on update
    pub required: bool,
    /// Guarded by the uniqueness check and a store unique constraint
    pub unique: bool,
    /// Accepted by partial updates
    pub updatable: bool,
    /// Applied on create when the field is absent
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true, unique: false, updatable: true, default: None }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false, unique: false, updatable: true, default: None }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    pub const fn create_only(self) -> Self {
        Self { updatable: false, ..self }
    }

    pub const fn with_default(self, default: &'static str) -> Self {
        Self { default: Some(default), ..self }
    }

    /// SQL cast applied to the bound parameter, if the column is not text
    pub fn sql_cast(&self) -> Option<&'static str> {
        match self.kind {
            FieldKind::Price => Some("numeric"),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ResourceSchema {
    /// Display name used in messages ("Product not found")
    pub label: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    /// Columns stripped from every outward representation
    pub hidden: &'static [&'static str],
    /// Last-modified column touched on every write
    pub touch_column: &'static str,
    pub created_column: &'static str,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Sanitized outward representation of a stored record
    pub fn canonical(&self, mut record: super::Record) -> super::Record {
        for column in self.hidden {
            record.remove(*column);
        }
        record
    }

    pub fn not_found_message(&self) -> String {
        format!("{} not found", self.label)
    }

    pub fn default_value(spec: &FieldSpec) -> Option<Value> {
        spec.default.map(|d| Value::String(d.to_string()))
    }
}
