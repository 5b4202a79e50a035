pub mod envelope;
pub mod rules;

pub use envelope::{collect, FailureEnvelope};

use serde_json::Value;

/// Ordered, human-readable problems found for one or more fields
pub type Problems = Vec<String>;

/// Field kinds known to the validator. Each maps to one rule in `rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    IdentityName,
    Email,
    Password,
    Phone,
    Address,
    Price,
    Title,
    Body,
    DisplayName,
    ShortText,
    LongText,
    MediaUrl,
    ArticleStatus,
    Role,
}

impl FieldKind {
    fn rule(self) -> fn(&str, &Value) -> Problems {
        match self {
            FieldKind::IdentityName => rules::identity_name,
            FieldKind::Email => rules::email,
            FieldKind::Password => rules::password,
            FieldKind::Phone => rules::phone,
            FieldKind::Address => rules::address,
            FieldKind::Price => rules::price,
            FieldKind::Title => rules::title,
            FieldKind::Body => rules::body_text,
            FieldKind::DisplayName => rules::display_name,
            FieldKind::ShortText => rules::short_text,
            FieldKind::LongText => rules::long_text,
            FieldKind::MediaUrl => rules::media_url,
            FieldKind::ArticleStatus => rules::article_status,
            FieldKind::Role => rules::role,
        }
    }
}

/// True for absent, null and whitespace-only string values
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Run the rule for `kind` over a candidate value.
///
/// A blank candidate is reported once as missing when `required` is set and
/// accepted otherwise; the kind rule only sees present values.
pub fn check(kind: FieldKind, field: &str, value: Option<&Value>, required: bool) -> Problems {
    if is_blank(value) {
        return if required {
            vec![format!("{} is required", field)]
        } else {
            Vec::new()
        };
    }

    match value {
        Some(v) => (kind.rule())(field, v),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const REQUIRED_KINDS: &[FieldKind] = &[
        FieldKind::IdentityName,
        FieldKind::Email,
        FieldKind::Password,
        FieldKind::Price,
        FieldKind::Title,
        FieldKind::Body,
        FieldKind::DisplayName,
        FieldKind::ArticleStatus,
        FieldKind::Role,
    ];

    #[test]
    fn missing_required_value_yields_one_problem_naming_field() {
        for kind in REQUIRED_KINDS {
            for candidate in [None, Some(json!(null)), Some(json!("")), Some(json!("   "))] {
                let problems = check(*kind, "field_x", candidate.as_ref(), true);
                assert_eq!(problems, vec!["field_x is required".to_string()], "{kind:?}");
            }
        }
    }

    #[test]
    fn conforming_values_yield_no_problems() {
        let samples = [
            (FieldKind::IdentityName, json!("ana")),
            (FieldKind::Email, json!("ana@x.com")),
            (FieldKind::Password, json!("Abcd1234")),
            (FieldKind::Price, json!(12000)),
            (FieldKind::Title, json!("Grand opening")),
            (FieldKind::Body, json!("We are open.")),
            (FieldKind::DisplayName, json!("Coffee")),
            (FieldKind::ArticleStatus, json!("draft")),
            (FieldKind::Role, json!("user")),
        ];
        for (kind, value) in samples {
            assert!(check(kind, "f", Some(&value), true).is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn optional_fields_accept_absence() {
        assert!(check(FieldKind::Phone, "phone", None, false).is_empty());
        assert!(check(FieldKind::Address, "address", Some(&json!(null)), false).is_empty());
        assert_eq!(check(FieldKind::Phone, "phone", Some(&json!("12")), false).len(), 2);
    }
}
