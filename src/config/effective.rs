//! Effective service configuration with provenance
//!
//! Captures the merged configuration plus where each layer came from.

use std::fs;
use std::path::{Path, PathBuf};

use cascade_merge::MergePolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sections {
    store: StoreSection,
    merge: MergeSection,
    log: LogSection,
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    root: String,
}

#[derive(Debug, Deserialize)]
struct MergeSection {
    deeply_merged_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    filter: String,
}

/// Effective service configuration
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Root directory of the file-backed settings store
    pub store_root: PathBuf,

    /// Top-level settings keys that are deeply merged
    pub deeply_merged_fields: Vec<String>,

    /// tracing filter used when RUST_LOG is unset
    pub log_filter: String,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl ServiceConfig {
    /// Build the effective config from builtin defaults, an optional TOML
    /// file, and CLI overrides (same shape as the file).
    pub fn build(config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        if let Some(path) = config_path {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let sections: Sections = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        validate(&sections)?;

        Ok(Self {
            store_root: PathBuf::from(sections.store.root),
            deeply_merged_fields: sections.merge.deeply_merged_fields,
            log_filter: sections.log.filter,
            config: merged,
            sources,
        })
    }

    /// Merge policy for the configured deeply merged fields.
    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy::new(self.deeply_merged_fields.iter().cloned())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

    let toml_value: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    Ok((toml_to_json(toml_value), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn validate(sections: &Sections) -> Result<(), ConfigError> {
    if sections.store.root.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "store.root must not be empty".to_string(),
        ));
    }
    if sections
        .merge
        .deeply_merged_fields
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "merge.deeply_merged_fields must not contain empty names".to_string(),
        ));
    }
    Ok(())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
