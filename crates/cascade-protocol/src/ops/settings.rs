//! Settings query and mutation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `settings.get` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSettingsRequest {
    /// Subject whose cascade to merge (`global`, `org:<name>`, `user:<name>`).
    pub subject: String,
}

/// `settings.update` payload: a single top-level property edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Subject whose own document is edited.
    pub subject: String,
    /// Version the client last observed; 0 if the subject has no settings yet.
    #[serde(default)]
    pub last_version: u64,
    /// Top-level key to set or remove.
    pub property: String,
    /// New value (ignored when `remove` is set).
    #[serde(default)]
    pub value: serde_json::Value,
    /// Remove the property instead of setting it.
    #[serde(default)]
    pub remove: bool,
    /// Writer identity recorded on the new version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A layer that contributed to a merged view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSource {
    pub subject: String,
    pub version: u64,
}

/// Merged settings for a subject's whole cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsView {
    pub subject: String,
    /// Current version of the subject's own document (0 if none). Clients
    /// pass this back as `last_version` when editing.
    pub version: u64,
    /// The merged settings object.
    pub settings: serde_json::Value,
    /// Contributing layers, least specific first.
    pub sources: Vec<LayerSource>,
    /// SHA-256 of the canonical JSON of `settings`.
    pub digest: String,
}

/// Metadata of a stored settings version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub subject: String,
    pub version: u64,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// `settings.update` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettingsResponse {
    /// The newly written version.
    pub document: DocumentInfo,
    /// The subject's merged settings after the write. Absent if the cascade
    /// could not be merged once the write was committed; the write itself
    /// still stands, and a `settings.get` reports the merge error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<SettingsView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_defaults() {
        let request: UpdateSettingsRequest =
            serde_json::from_str(r#"{"subject":"user:alice","property":"motd"}"#).unwrap();
        assert_eq!(request.last_version, 0);
        assert!(request.value.is_null());
        assert!(!request.remove);
        assert!(request.author.is_none());
    }

    #[test]
    fn test_update_request_with_value() {
        let request: UpdateSettingsRequest = serde_json::from_str(
            r#"{"subject":"org:acme","last_version":4,"property":"p","value":{"x":123},"author":"bob"}"#,
        )
        .unwrap();
        assert_eq!(request.last_version, 4);
        assert_eq!(request.value, serde_json::json!({"x": 123}));
        assert_eq!(request.author.as_deref(), Some("bob"));
    }
}
