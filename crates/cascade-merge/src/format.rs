//! Deterministic serialization of settings values.

use serde_json::{Map, Value};

/// Serialize with keys sorted at every level and two-space indentation.
///
/// The output does not end with a newline. Equal values always produce
/// byte-identical text, regardless of the key order they were built in.
pub fn to_sorted_pretty(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&sorted(value))
}

/// Compact form of [`to_sorted_pretty`].
pub fn to_sorted_compact(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&sorted(value))
}

/// Rebuild `value` with object keys inserted in lexicographic order.
pub fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rebuilt: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), sorted(v)))
                .collect();
            Value::Object(rebuilt)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_two_space_indent() {
        let value = json!({"p": {"x": 123}});
        assert_eq!(
            to_sorted_pretty(&value).unwrap(),
            "{\n  \"p\": {\n    \"x\": 123\n  }\n}"
        );
    }

    #[test]
    fn test_keys_sorted_at_every_level() {
        let value = json!({"b": {"z": 1, "a": 2}, "a": [{"d": 1, "c": 2}]});
        assert_eq!(
            to_sorted_compact(&value).unwrap(),
            r#"{"a":[{"c":2,"d":1}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(to_sorted_pretty(&json!({})).unwrap(), "{}");
    }
}
