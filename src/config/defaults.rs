//! Built-in defaults (layer 1)

use cascade_merge::DEFAULT_DEEPLY_MERGED_FIELDS;
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "settings-cascade.toml";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Root directory of the file-backed store (default: ".settings")
    pub store_root: String,

    /// Top-level keys merged across layers instead of overridden
    pub deeply_merged_fields: Vec<String>,

    /// tracing filter directive (default: "settings_cascade=info")
    pub log_filter: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            store_root: ".settings".to_string(),
            deeply_merged_fields: DEFAULT_DEEPLY_MERGED_FIELDS
                .iter()
                .map(|field| field.to_string())
                .collect(),
            log_filter: "settings_cascade=info".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "store": {
                "root": self.store_root
            },
            "merge": {
                "deeply_merged_fields": self.deeply_merged_fields
            },
            "log": {
                "filter": self.log_filter
            }
        })
    }
}
