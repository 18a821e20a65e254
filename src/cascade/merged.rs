//! Merged configuration with provenance.

use cascade_merge::to_sorted_pretty;
use cascade_protocol::ops::{LayerSource, SettingsView};
use cascade_store::Subject;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::SettingsError;

/// A stored layer that contributed to a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerVersion {
    pub subject: Subject,
    pub version: u64,
}

/// The effective settings of a subject, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedConfiguration {
    /// Subject whose cascade was merged
    pub subject: Subject,

    /// Current version of the subject's own document (0 if none)
    pub version: u64,

    /// The merged settings object
    pub settings: Value,

    /// Layers with a stored document, least specific first
    pub sources: Vec<LayerVersion>,

    /// SHA-256 of the RFC 8785 canonical form of `settings`
    pub digest: String,
}

impl MergedConfiguration {
    pub fn new(
        subject: Subject,
        version: u64,
        settings: Value,
        sources: Vec<LayerVersion>,
    ) -> Result<Self, SettingsError> {
        let digest = content_digest(&settings)?;
        Ok(Self {
            subject,
            version,
            settings,
            sources,
            digest,
        })
    }

    /// Deterministic pretty form of the merged settings.
    pub fn to_pretty_json(&self) -> Result<String, SettingsError> {
        to_sorted_pretty(&self.settings)
            .map_err(|e| SettingsError::Validation(format!("settings serialization failed: {}", e)))
    }

    pub fn to_view(&self) -> SettingsView {
        SettingsView {
            subject: self.subject.to_string(),
            version: self.version,
            settings: self.settings.clone(),
            sources: self
                .sources
                .iter()
                .map(|layer| LayerSource {
                    subject: layer.subject.to_string(),
                    version: layer.version,
                })
                .collect(),
            digest: self.digest.clone(),
        }
    }
}

/// SHA-256 hex digest of the JCS (RFC 8785) serialization of `value`.
pub fn content_digest(value: &Value) -> Result<String, SettingsError> {
    let jcs_bytes = serde_json_canonicalizer::to_vec(value)
        .map_err(|e| SettingsError::Validation(format!("canonicalization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Ok(hex::encode(hasher.finalize()))
}
