//! Service config layering
//!
//! Config layers merge with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)
//!
//! Unlike the settings cascade, a config file that lists
//! `deeply_merged_fields` replaces the built-in list outright.

use serde_json::Value;

/// Deep merge two JSON values.
///
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars and null: second wins
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge config layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let result = deep_merge(json!({"log": {"filter": "info"}}), json!({"log": {"filter": "debug"}}));
        assert_eq!(result["log"]["filter"], "debug");
    }

    #[test]
    fn test_sibling_keys_preserved() {
        let base = json!({
            "store": {"root": ".settings"},
            "log": {"filter": "info"}
        });
        let overlay = json!({"store": {"root": "/var/lib/settings"}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["store"]["root"], "/var/lib/settings");
        assert_eq!(result["log"]["filter"], "info");
    }

    #[test]
    fn test_field_list_replaced() {
        let base = json!({"merge": {"deeply_merged_fields": ["motd", "notices"]}});
        let overlay = json!({"merge": {"deeply_merged_fields": ["extensions"]}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["merge"]["deeply_merged_fields"], json!(["extensions"]));
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"value": 100}), json!({"value": null}));
        assert!(result["value"].is_null());
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({"store": {"root": ".settings"}, "log": {"filter": "info"}});
        let file = json!({"store": {"root": "/srv/settings"}});
        let cli = json!({"log": {"filter": "trace"}});

        let result = merge_layers(vec![builtin, file, cli]);

        assert_eq!(result["store"]["root"], "/srv/settings");
        assert_eq!(result["log"]["filter"], "trace");
    }

    #[test]
    fn test_merge_no_layers() {
        assert!(merge_layers(vec![]).is_null());
    }
}
