//! Normalization of the scrape API's structured extraction payload.

use serde_json::{Map, Value};

/// A usable structured extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// A JSON object, possibly decoded from a string payload
    Fields(Map<String, Value>),
    /// A string payload that did not decode to an object
    Text(String),
}

impl Extracted {
    /// Raw field lookup; text payloads have no fields.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Fields(map) => map.get(key).filter(|v| !v.is_null()),
            Self::Text(_) => None,
        }
    }

    /// Field as a non-empty string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Field rendered as text: strings as-is, other values as JSON.
    pub fn text_field(&self, key: &str) -> Option<String> {
        self.field(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Free-text notes: the `notes` field, or the whole payload when it was text.
    pub fn notes(&self) -> String {
        match self {
            Self::Fields(_) => self.text_field("notes").unwrap_or_default(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Normalize an extraction payload.
///
/// Objects are used as-is. Strings are decoded as JSON; if that does not
/// produce an object the string itself is kept as text. Anything else
/// (absent, null, numbers, arrays) yields `None`.
pub fn normalize_extract(payload: Option<&Value>) -> Option<Extracted> {
    match payload? {
        Value::Object(map) => Some(Extracted::Fields(map.clone())),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(Extracted::Fields(map)),
            _ => Some(Extracted::Text(raw.clone())),
        },
        _ => None,
    }
}

/// Whether a payload counts as present (non-null, non-empty).
pub fn is_present(payload: Option<&Value>) -> bool {
    match payload {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Object(m)) => !m.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_object_is_used_directly() {
        let payload = json!({"availability": "taken", "price": null});
        let extracted = normalize_extract(Some(&payload)).unwrap();
        assert_eq!(extracted.str_field("availability"), Some("taken"));
        assert_eq!(extracted.field("price"), None);
    }

    #[test]
    fn test_string_payload_is_decoded() {
        let payload = json!(r#"{"pdfUrl": "/paper.pdf", "notes": "ok"}"#);
        let extracted = normalize_extract(Some(&payload)).unwrap();
        assert_eq!(extracted.str_field("pdfUrl"), Some("/paper.pdf"));
        assert_eq!(extracted.notes(), "ok");
    }

    #[test]
    fn test_undecodable_string_becomes_notes() {
        let payload = json!("The domain appears to be available");
        let extracted = normalize_extract(Some(&payload)).unwrap();
        assert_eq!(extracted, Extracted::Text("The domain appears to be available".into()));
        assert_eq!(extracted.notes(), "The domain appears to be available");
        assert!(extracted.field("availability").is_none());
    }

    #[test]
    fn test_absent_and_unsupported_payloads() {
        assert!(normalize_extract(None).is_none());
        assert!(normalize_extract(Some(&Value::Null)).is_none());
        assert!(normalize_extract(Some(&json!([1, 2]))).is_none());
    }

    #[test]
    fn test_non_string_notes_are_json_encoded() {
        let payload = json!({"notes": ["a", "b"]});
        let extracted = normalize_extract(Some(&payload)).unwrap();
        assert_eq!(extracted.notes(), r#"["a","b"]"#);
    }
}
