// Field validation rules
//
// One function per field kind. Every rule receives the field name (used in
// messages) and a present, non-null candidate value, and returns the list of
// problems it found. Presence/required handling lives in `super::check`.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use super::Problems;
use crate::types::{ArticleStatus, Role};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const PHONE_MIN: usize = 6;
pub const PHONE_MAX: usize = 20;
pub const ADDRESS_MAX: usize = 255;
pub const TITLE_MAX: usize = 200;
pub const NAME_MAX: usize = 100;
pub const SHORT_TEXT_MAX: usize = 100;
pub const LONG_TEXT_MAX: usize = 1000;

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email pattern compiles")
});

fn as_text<'a>(field: &str, value: &'a Value) -> Result<&'a str, Problems> {
    value
        .as_str()
        .ok_or_else(|| vec![format!("{} must be a string", field)])
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn identity_name(field: &str, value: &Value) -> Problems {
    let name = match as_text(field, value) {
        Ok(s) => s,
        Err(problems) => return problems,
    };

    let mut problems = Vec::new();
    let len = char_len(name);
    if len < USERNAME_MIN {
        problems.push(format!("{} must be at least {} characters", field, USERNAME_MIN));
    }
    if len > USERNAME_MAX {
        problems.push(format!("{} must be at most {} characters", field, USERNAME_MAX));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        problems.push(format!(
            "{} may only contain letters, digits, '_', '.' and '-'",
            field
        ));
    }
    problems
}

pub fn email(field: &str, value: &Value) -> Problems {
    let address = match as_text(field, value) {
        Ok(s) => s,
        Err(problems) => return problems,
    };

    if char_len(address) > EMAIL_MAX || !EMAIL_SHAPE.is_match(address) {
        return vec![format!("{} must be a valid email address", field)];
    }
    Vec::new()
}

pub fn password(field: &str, value: &Value) -> Problems {
    let secret = match as_text(field, value) {
        Ok(s) => s,
        Err(problems) => return problems,
    };

    let mut problems = Vec::new();
    if char_len(secret) < PASSWORD_MIN {
        problems.push(format!("{} must be at least {} characters", field, PASSWORD_MIN));
    }
    if !secret.chars().any(|c| c.is_alphabetic()) {
        problems.push(format!("{} must contain at least one letter", field));
    }
    if !secret.chars().any(|c| c.is_ascii_digit()) {
        problems.push(format!("{} must contain at least one digit", field));
    }
    problems
}

pub fn phone(field: &str, value: &Value) -> Problems {
    let number = match as_text(field, value) {
        Ok(s) => s,
        Err(problems) => return problems,
    };

    let mut problems = Vec::new();
    let len = char_len(number);
    if !(PHONE_MIN..=PHONE_MAX).contains(&len) {
        problems.push(format!(
            "{} must be between {} and {} characters",
            field, PHONE_MIN, PHONE_MAX
        ));
    }
    if !number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        problems.push(format!(
            "{} may only contain digits, spaces and '+', '-', '(', ')'",
            field
        ));
    } else if number.chars().filter(|c| c.is_ascii_digit()).count() < PHONE_MIN {
        problems.push(format!("{} must contain at least {} digits", field, PHONE_MIN));
    }
    problems
}

pub fn address(field: &str, value: &Value) -> Problems {
    let text = match as_text(field, value) {
        Ok(s) => s,
        Err(problems) => return problems,
    };

    let mut problems = bounded(field, text, ADDRESS_MAX);
    if text.chars().any(|c| c.is_control() && c != '\n') {
        problems.push(format!("{} must not contain control characters", field));
    }
    problems
}

/// Parse a price candidate. Accepts JSON numbers and numeric strings
/// (multipart form fields arrive as text).
pub fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub fn price(field: &str, value: &Value) -> Problems {
    let shown = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    match parse_price(value) {
        None => vec![format!("{} must be a number, got '{}'", field, shown)],
        Some(amount) if amount.is_sign_negative() && !amount.is_zero() => {
            vec![format!("{} must not be negative, got '{}'", field, shown)]
        }
        Some(_) => Vec::new(),
    }
}

pub fn title(field: &str, value: &Value) -> Problems {
    match as_text(field, value) {
        Ok(text) => bounded(field, text, TITLE_MAX),
        Err(problems) => problems,
    }
}

pub fn display_name(field: &str, value: &Value) -> Problems {
    match as_text(field, value) {
        Ok(text) => bounded(field, text, NAME_MAX),
        Err(problems) => problems,
    }
}

/// Article body. Length is unbounded; blank values are caught as missing.
pub fn body_text(field: &str, value: &Value) -> Problems {
    match as_text(field, value) {
        Ok(_) => Vec::new(),
        Err(problems) => problems,
    }
}

pub fn short_text(field: &str, value: &Value) -> Problems {
    match as_text(field, value) {
        Ok(text) => bounded(field, text, SHORT_TEXT_MAX),
        Err(problems) => problems,
    }
}

pub fn long_text(field: &str, value: &Value) -> Problems {
    match as_text(field, value) {
        Ok(text) => bounded(field, text, LONG_TEXT_MAX),
        Err(problems) => problems,
    }
}

pub fn media_url(field: &str, value: &Value) -> Problems {
    let text = match as_text(field, value) {
        Ok(s) => s,
        Err(problems) => return problems,
    };

    match url::Url::parse(text) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Vec::new()
        }
        _ => vec![format!("{} must be an absolute http(s) URL", field)],
    }
}

pub fn article_status(field: &str, value: &Value) -> Problems {
    one_of(field, value, ArticleStatus::ACCEPTED)
}

pub fn role(field: &str, value: &Value) -> Problems {
    one_of(field, value, Role::ACCEPTED)
}

/// Parse a path identifier. Must be a positive integer.
pub fn identifier(raw: &str) -> Result<i64, Problems> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(vec![format!("id must be a positive integer, got '{}'", raw)]),
    }
}

fn one_of(field: &str, value: &Value, accepted: &[&str]) -> Problems {
    let text = match as_text(field, value) {
        Ok(s) => s,
        Err(_) => "",
    };

    if accepted.contains(&text) {
        Vec::new()
    } else {
        vec![format!("{} must be one of: {}", field, accepted.join(", "))]
    }
}

fn bounded(field: &str, text: &str, max: usize) -> Problems {
    if char_len(text) > max {
        vec![format!("{} must be at most {} characters", field, max)]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_name_reports_each_violation() {
        assert!(identity_name("username", &json!("ana")).is_empty());
        assert!(identity_name("username", &json!("ana.maria_01-x")).is_empty());

        let problems = identity_name("username", &json!("a!"));
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("at least 3"));
        assert!(problems[1].contains("may only contain"));

        let long = "x".repeat(USERNAME_MAX + 1);
        assert_eq!(identity_name("username", &json!(long)).len(), 1);
    }

    #[test]
    fn non_string_values_report_type_once() {
        assert_eq!(
            identity_name("username", &json!(42)),
            vec!["username must be a string".to_string()]
        );
        assert_eq!(email("email", &json!(true)).len(), 1);
    }

    #[test]
    fn malformed_email_reports_exactly_one_problem() {
        assert!(email("email", &json!("ana@x.com")).is_empty());
        assert!(email("email", &json!("first.last+tag@mail.example.org")).is_empty());
        for bad in ["ana", "ana@", "@x.com", "ana@x", "ana @x.com", "ana@x..com"] {
            assert_eq!(email("email", &json!(bad)).len(), 1, "{bad}");
        }
    }

    #[test]
    fn password_lists_every_unmet_criterion() {
        assert!(password("password", &json!("Abcd1234")).is_empty());
        assert_eq!(password("password", &json!("abc")).len(), 2);
        assert_eq!(password("password", &json!("!!!")).len(), 3);
        assert_eq!(password("password", &json!("abcdefgh")).len(), 1);
        assert_eq!(password("password", &json!("12345678")).len(), 1);
    }

    #[test]
    fn phone_and_address_bounds() {
        assert!(phone("phone", &json!("+62 812-3456-7890")).is_empty());
        assert_eq!(phone("phone", &json!("123")).len(), 2);
        assert_eq!(phone("phone", &json!("08123abc45")).len(), 1);
        assert!(address("address", &json!("Jl. Merdeka 1, Jakarta")).is_empty());
        assert_eq!(address("address", &json!("x".repeat(ADDRESS_MAX + 1))).len(), 1);
        assert_eq!(address("address", &json!("bad\u{0007}bell")).len(), 1);
    }

    #[test]
    fn price_accepts_numbers_and_numeric_strings() {
        assert!(price("price", &json!(0)).is_empty());
        assert!(price("price", &json!(19.99)).is_empty());
        assert!(price("price", &json!("15000.50")).is_empty());
        assert_eq!(parse_price(&json!("15000.50")), Decimal::from_str("15000.50").ok());
    }

    #[test]
    fn price_names_the_offending_value() {
        let negative = price("price", &json!(-5));
        assert_eq!(negative, vec!["price must not be negative, got '-5'".to_string()]);

        let text = price("price", &json!("cheap"));
        assert_eq!(text, vec!["price must be a number, got 'cheap'".to_string()]);

        assert_eq!(price("price", &json!("NaN")).len(), 1);
        assert_eq!(price("price", &json!([1])).len(), 1);
    }

    #[test]
    fn enums_report_accepted_values() {
        assert!(article_status("status", &json!("published")).is_empty());
        assert_eq!(
            article_status("status", &json!("unknown")),
            vec!["status must be one of: draft, published, archived".to_string()]
        );
        assert!(role("role", &json!("admin")).is_empty());
        assert_eq!(
            role("role", &json!("root")),
            vec!["role must be one of: user, admin".to_string()]
        );
    }

    #[test]
    fn identifier_requires_positive_integer() {
        assert_eq!(identifier("42"), Ok(42));
        assert!(identifier("0").is_err());
        assert!(identifier("-1").is_err());
        assert!(identifier("abc").is_err());
        assert!(identifier("1.5").is_err());
    }

    #[test]
    fn media_url_requires_http_scheme() {
        assert!(media_url("image_url", &json!("https://cdn.example.com/a.png")).is_empty());
        assert_eq!(media_url("image_url", &json!("ftp://example.com/a.png")).len(), 1);
        assert_eq!(media_url("image_url", &json!("not a url")).len(), 1);
    }
}
