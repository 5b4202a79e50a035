// Uniqueness guard
//
// Check-then-act: the lookup and the later write are separate round-trips,
// so the store's unique constraints still back this up.

use serde_json::Value;
use std::future::Future;

use crate::database::{Record, StoreError};

/// Another record already holds a unique value
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub field: String,
    pub value: Value,
}

impl Conflict {
    pub fn message(&self) -> String {
        let shown = match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("{} '{}' is already in use", self.field, shown)
    }
}

/// Decide whether `new_value` for a unique `field` collides with a
/// different record.
///
/// No lookup happens when the value is unchanged from `current_value`.
pub async fn check_unique<F, Fut>(
    field: &str,
    new_value: &Value,
    current_value: Option<&Value>,
    lookup: F,
) -> Result<Option<Conflict>, StoreError>
where
    F: FnOnce(Value) -> Fut,
    Fut: Future<Output = Result<Option<Record>, StoreError>>,
{
    if current_value == Some(new_value) {
        tracing::debug!("{} unchanged, skipping uniqueness lookup", field);
        return Ok(None);
    }

    match lookup(new_value.clone()).await? {
        Some(_) => Ok(Some(Conflict { field: field.to_string(), value: new_value.clone() })),
        None => Ok(None),
    }
}
