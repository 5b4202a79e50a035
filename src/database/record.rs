use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::schema::{ResourceSchema, SYSTEM_FIELDS};

/// A stored row as returned by a store, keyed by column name
pub type Record = Map<String, Value>;

/// Intent for one field of a sparse input.
///
/// `Absent` leaves the stored value untouched, `Clear` writes NULL and
/// `Set` writes the given value. Keeping "not sent" and "sent as null" apart
/// is what lets a partial update never overwrite a field by accident.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn as_ref(&self) -> Patch<&T> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Clear => Patch::Clear,
            Patch::Set(v) => Patch::Set(v),
        }
    }

    /// The value a validator sees: `None` for both absent and cleared
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Patch<Value> {
    fn from(value: Value) -> Self {
        if value.is_null() {
            Patch::Clear
        } else {
            Patch::Set(value)
        }
    }
}

/// Errors that can occur while reading API input into a field set
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RecordError {
    #[error("System field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(&'static str),
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// Sparse mapping of recognized field names to their intent.
///
/// Only names declared by the resource schema are kept; anything else in
/// the input is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    entries: BTreeMap<&'static str, Patch<Value>>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read API input. Rejects non-object bodies and system columns.
    pub fn from_json(schema: &ResourceSchema, json: Value) -> Result<Self, RecordError> {
        let map = match json {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        };

        let mut set = Self::new();
        for (key, value) in map {
            if let Some(system) = SYSTEM_FIELDS.iter().find(|&&f| f == key) {
                return Err(RecordError::SystemFieldNotAllowed(*system));
            }
            match schema.field(&key) {
                Some(spec) => {
                    set.entries.insert(spec.name, Patch::from(value));
                }
                None => tracing::debug!("Ignoring unrecognized field '{}' for {}", key, schema.table),
            }
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Patch<&Value> {
        self.entries.get(name).map(Patch::as_ref).unwrap_or_default()
    }

    pub fn insert(&mut self, name: &'static str, patch: Patch<Value>) -> &mut Self {
        if patch.is_absent() {
            self.entries.remove(name);
        } else {
            self.entries.insert(name, patch);
        }
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) -> &mut Self {
        self.insert(name, Patch::Set(value.into()))
    }

    pub fn remove(&mut self, name: &str) -> Patch<Value> {
        self.entries.remove(name).unwrap_or_default()
    }

    /// Keep only the named fields
    pub fn restrict(&mut self, allowed: &[&str]) -> &mut Self {
        self.entries.retain(|name, _| allowed.contains(name));
        self
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> &mut Self {
        self.entries.retain(|name, _| keep(name));
        self
    }

    /// Treat blank strings as "sent as null".
    ///
    /// On create a cleared field falls back to its default or NULL; on
    /// update it is written as NULL, or reported missing when required.
    pub fn blank_to_clear(&mut self) -> &mut Self {
        for patch in self.entries.values_mut() {
            if matches!(patch, Patch::Set(Value::String(s)) if s.trim().is_empty()) {
                *patch = Patch::Clear;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ACCOUNTS, PRODUCTS};
    use serde_json::json;

    #[test]
    fn distinguishes_absent_clear_and_set() {
        let fields = FieldSet::from_json(&ACCOUNTS, json!({"phone": null, "address": "Jl. Sudirman 5"})).unwrap();
        assert_eq!(fields.get("phone"), Patch::Clear);
        assert_eq!(fields.get("address"), Patch::Set(&json!("Jl. Sudirman 5")));
        assert_eq!(fields.get("email"), Patch::Absent);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let fields = FieldSet::from_json(&PRODUCTS, json!({"colour": "red", "name": "Mug"})).unwrap();
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn system_fields_and_non_objects_are_rejected() {
        assert_eq!(
            FieldSet::from_json(&PRODUCTS, json!({"id": 7})),
            Err(RecordError::SystemFieldNotAllowed("id"))
        );
        assert!(matches!(
            FieldSet::from_json(&PRODUCTS, json!(["name"])),
            Err(RecordError::InvalidJson(_))
        ));
    }

    #[test]
    fn blank_strings_become_clears() {
        let mut fields = FieldSet::from_json(&ACCOUNTS, json!({"role": "  ", "phone": "", "username": "ana"})).unwrap();
        fields.blank_to_clear();
        assert_eq!(fields.get("role"), Patch::Clear);
        assert_eq!(fields.get("phone"), Patch::Clear);
        assert_eq!(fields.get("username"), Patch::Set(&json!("ana")));
    }

    #[test]
    fn restrict_drops_other_fields() {
        let mut fields = FieldSet::from_json(&ACCOUNTS, json!({"username": "ana", "role": "admin"})).unwrap();
        fields.restrict(&["username", "email"]);
        assert_eq!(fields.get("role"), Patch::Absent);
        assert_eq!(fields.get("username"), Patch::Set(&json!("ana")));
    }
}
