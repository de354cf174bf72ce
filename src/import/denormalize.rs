// ABOUTME: Value denormalization for the import path
// ABOUTME: Repairs legacy double-encoded JSON and renders transport values as bind text

use serde_json::Value;

/// Unwrap the legacy double-encoding defect: a JSON object whose single key
/// is itself a JSON-looking string, e.g. `{"{\"url\":\"http://x\"}": ""}`.
///
/// Returns the repaired value, or None when the shape does not match.
pub fn repair_double_encoded(value: &Value) -> Option<Value> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    let key = object.keys().next()?.trim();
    if !key.starts_with('{') && !key.starts_with('[') {
        return None;
    }
    serde_json::from_str(key).ok()
}

/// Shape-based guess at base64-encoded binary: long, padded to a multiple of
/// four, and drawn entirely from the base64 alphabet.
///
/// A legitimate long alphanumeric string matches too, so this is only ever
/// used to warn, never to reinterpret; actual binary restoration is driven
/// by the target column type.
pub fn looks_like_base64(text: &str) -> bool {
    if text.len() < 64 || text.len() % 4 != 0 {
        return false;
    }
    let trimmed = text.trim_end_matches('=');
    if text.len() - trimmed.len() > 2 {
        return false;
    }
    trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Render a transport value as the bind text for a JSON-typed target column.
///
/// Structured values are re-serialized to JSON text so the driver never
/// double-encodes them. A string only passes through untouched when its
/// content is itself an object or array shape: that is how legacy artifacts
/// carried JSON columns as text. Any other string is a JSON string scalar
/// ("true", "58") and keeps its quotes, otherwise the target would store a
/// boolean or number instead of the string.
pub fn json_column_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if is_json_container_text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_json_container_text(text: &str) -> bool {
    let trimmed = text.trim_start();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(text).is_ok()
}

/// Render a transport value as bind text for a non-JSON target column;
/// the statement casts it to the column's real type server-side.
pub fn bind_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        structured => Some(structured.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repair_double_encoded_object() {
        let broken = json!({"{\"url\":\"http://x\"}": ""});
        let repaired = repair_double_encoded(&broken).unwrap();
        assert_eq!(repaired, json!({"url": "http://x"}));
    }

    #[test]
    fn test_repair_double_encoded_array_key() {
        let broken = json!({"[1,2,3]": null});
        assert_eq!(repair_double_encoded(&broken).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_repair_leaves_normal_values_alone() {
        assert!(repair_double_encoded(&json!({"url": "http://x"})).is_none());
        assert!(repair_double_encoded(&json!({"a": 1, "b": 2})).is_none());
        assert!(repair_double_encoded(&json!("plain")).is_none());
        assert!(repair_double_encoded(&json!(42)).is_none());
        // Single key that is not JSON-shaped
        assert!(repair_double_encoded(&json!({"note": "x"})).is_none());
        // JSON-shaped key that does not parse
        assert!(repair_double_encoded(&json!({"{not json": ""})).is_none());
    }

    #[test]
    fn test_looks_like_base64() {
        let encoded = "QUJD".repeat(20); // 80 chars of base64 alphabet
        assert!(looks_like_base64(&encoded));
        let padded = format!("{}==", "QUJD".repeat(20)[..78].to_string());
        assert!(looks_like_base64(&padded));

        assert!(!looks_like_base64("short"));
        // Wrong length for base64
        let odd = "A".repeat(65);
        assert!(!looks_like_base64(&odd));
        // Contains characters outside the alphabet
        let spaced = format!("{} {}", "A".repeat(32), "B".repeat(31));
        assert!(!looks_like_base64(&spaced));
    }

    #[test]
    fn test_json_column_text_reserializes_structured() {
        let structured = json!({"url": "http://x"});
        assert_eq!(
            json_column_text(&structured).unwrap(),
            "{\"url\":\"http://x\"}"
        );
        assert_eq!(json_column_text(&Value::Null), None);
    }

    #[test]
    fn test_json_column_text_passes_legacy_container_text_through() {
        // Legacy artifacts carried JSON columns as object/array text:
        // no second layer of quoting
        let as_text = json!("{\"url\":\"http://x\"}");
        assert_eq!(
            json_column_text(&as_text).unwrap(),
            "{\"url\":\"http://x\"}"
        );
        let array_text = json!("[1,2,3]");
        assert_eq!(json_column_text(&array_text).unwrap(), "[1,2,3]");
        // A bare word is not JSON text and gets quoted into one
        let word = json!("hello");
        assert_eq!(json_column_text(&word).unwrap(), "\"hello\"");
    }

    #[test]
    fn test_json_column_text_keeps_string_scalars_quoted() {
        // A jsonb value that is the JSON string "true" must stay a string
        // after the round trip, not become a boolean
        assert_eq!(json_column_text(&json!("true")).unwrap(), "\"true\"");
        assert_eq!(json_column_text(&json!("58")).unwrap(), "\"58\"");
        assert_eq!(json_column_text(&json!("null")).unwrap(), "\"null\"");
        assert_eq!(json_column_text(&json!("42.5")).unwrap(), "\"42.5\"");
    }

    #[test]
    fn test_bind_text_scalars() {
        assert_eq!(bind_text(&json!(true)).unwrap(), "true");
        assert_eq!(bind_text(&json!(58)).unwrap(), "58");
        assert_eq!(bind_text(&json!(42.75)).unwrap(), "42.75");
        assert_eq!(bind_text(&json!("plain")).unwrap(), "plain");
        assert_eq!(bind_text(&Value::Null), None);
        assert_eq!(bind_text(&json!([1, 2])).unwrap(), "[1,2]");
    }
}
