//! RPC response types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RpcError};

/// RPC response envelope.
///
/// Exactly one of `payload` and `error` is present. Settings payloads are a
/// `SettingsView` for `settings.get` and an `UpdateSettingsResponse` for
/// `settings.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version (echoed from request, or 0 for probe).
    pub protocol_version: i32,
    /// Request ID echoed from the request.
    pub request_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(protocol_version: i32, request_id: String, payload: serde_json::Value) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn error(protocol_version: i32, request_id: String, error: RpcError) -> Self {
        Self {
            protocol_version,
            request_id,
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Wrap the outcome of an operation handler.
    pub fn from_result(
        protocol_version: i32,
        request_id: String,
        result: Result<serde_json::Value, RpcError>,
    ) -> Self {
        match result {
            Ok(payload) => Self::success(protocol_version, request_id, payload),
            Err(error) => Self::error(protocol_version, request_id, error),
        }
    }

    /// Error code of a failed response.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }

    /// Decode the success payload into an operation-specific response type.
    ///
    /// A failed response yields its own error; a missing or mistyped payload
    /// yields INVALID_REQUEST.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let payload = self
            .payload
            .clone()
            .ok_or_else(|| RpcError::invalid_request("response has no payload"))?;
        serde_json::from_value(payload)
            .map_err(|e| RpcError::invalid_request(format!("unexpected response payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{LayerSource, SettingsView};

    fn view() -> SettingsView {
        SettingsView {
            subject: "user:alice".into(),
            version: 2,
            settings: serde_json::json!({"motd": ["hi"]}),
            sources: vec![LayerSource {
                subject: "user:alice".into(),
                version: 2,
            }],
            digest: "00".repeat(32),
        }
    }

    #[test]
    fn test_success_omits_error() {
        let response = RpcResponse::success(1, "r".into(), serde_json::to_value(view()).unwrap());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert!(json.get("error").is_none());
        assert_eq!(response.payload_as::<SettingsView>().unwrap(), view());
    }

    #[test]
    fn test_error_omits_payload() {
        let response = RpcResponse::error(1, "r".into(), RpcError::conflict("global", 1, 2));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert!(json.get("payload").is_none());
        assert_eq!(response.error_code(), Some(ErrorCode::Conflict));
    }

    #[test]
    fn test_from_result() {
        let ok = RpcResponse::from_result(1, "a".into(), Ok(serde_json::json!({})));
        assert!(ok.ok);
        assert_eq!(ok.error_code(), None);

        let failed = RpcResponse::from_result(1, "b".into(), Err(RpcError::not_found("org:x")));
        assert!(!failed.ok);
        assert_eq!(failed.error_code(), Some(ErrorCode::NotFound));
    }

    #[test]
    fn test_payload_as_surfaces_error() {
        let response = RpcResponse::error(1, "r".into(), RpcError::not_found("user:bob"));
        let err = response.payload_as::<SettingsView>().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let wrong = RpcResponse::success(1, "r".into(), serde_json::json!({"nope": true}));
        let err = wrong.payload_as::<SettingsView>().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }
}
