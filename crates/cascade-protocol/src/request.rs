//! RPC request types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// RPC request envelope.
///
/// The `rpc` subcommand accepts a single JSON request on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version. For probe requests, this MUST be 0.
    pub protocol_version: i32,
    /// Operation name.
    pub op: String,
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RpcRequest {
    pub fn new(protocol_version: i32, op: impl Into<String>, request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            protocol_version,
            op: op.into(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Decode the payload into an operation-specific request type.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| RpcError::invalid_request(format!("invalid {} payload: {}", self.op, e)))
    }
}
