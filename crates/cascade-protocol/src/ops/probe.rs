//! Probe operation types.

use serde::{Deserialize, Serialize};

/// Probe response payload. The probe request payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// Version of the serving binary.
    pub service_version: String,
    /// Minimum protocol version supported.
    pub protocol_min: i32,
    /// Maximum protocol version supported.
    pub protocol_max: i32,
    /// Supported operation names.
    pub operations: Vec<String>,
    /// Top-level keys that are deeply merged by this deployment.
    pub deeply_merged_fields: Vec<String>,
}
