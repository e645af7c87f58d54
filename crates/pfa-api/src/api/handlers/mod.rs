//! Route handlers, one module per resource.

pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod users;

use serde_json::{Map, Value};

/// Parse a body as a non-empty JSON object.
pub(crate) fn json_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) if !fields.is_empty() => Some(fields),
        _ => None,
    }
}

/// Non-empty string field, or `None`.
pub(crate) fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object() {
        assert!(json_object(b"").is_none());
        assert!(json_object(b"not json").is_none());
        assert!(json_object(b"[1,2]").is_none());
        assert!(json_object(b"{}").is_none());
        assert!(json_object(br#"{"a":1}"#).is_some());
    }

    #[test]
    fn test_string_field() {
        let fields = json_object(br#"{"a":"x","b":"","c":3}"#).unwrap();
        assert_eq!(string_field(&fields, "a"), Some("x"));
        assert_eq!(string_field(&fields, "b"), None);
        assert_eq!(string_field(&fields, "c"), None);
        assert_eq!(string_field(&fields, "d"), None);
    }
}
