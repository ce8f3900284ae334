//! Field-level cleanup shared by every provider's raw model.

use serde_json::Value;

/// Trims a free-text value. Blank input is treated as absent.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trims and lowercases an email. Blank input is treated as absent.
pub fn clean_email(value: Option<&str>) -> Option<String> {
    clean_text(value).map(|v| v.to_lowercase())
}

/// Trims a phone number. Formatting is otherwise left untouched.
pub fn clean_phone(value: Option<&str>) -> Option<String> {
    clean_text(value)
}

/// Reads an identifier that providers may send as a JSON string or number.
pub fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => clean_text(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a scalar form answer as text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
