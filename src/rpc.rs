//! Settings RPC handler.
//!
//! Reads a single JSON request from the reader, dispatches it against the
//! settings service, and writes a single JSON response line:
//!
//!   settings-cascade rpc < request.json
//!
//! Protocol and payload failures are reported as error responses; only I/O
//! failures on the writer escape as `Err`.

use std::io::{self, BufRead, Write};

use cascade_protocol::{
    ops::{names, GetSettingsRequest, ProbeResponse, UpdateSettingsRequest},
    RpcError, RpcRequest, RpcResponse, PROTOCOL_MAX, PROTOCOL_MIN, PROTOCOL_VERSION_PROBE,
};
use serde::Serialize;

use crate::service::SettingsService;

pub struct RpcHandler {
    service: SettingsService,
}

impl RpcHandler {
    pub fn new(service: SettingsService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &SettingsService {
        &self.service
    }

    /// Run the handler against stdin and stdout.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Run the handler with custom I/O (for testing).
    pub fn run_with_io<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let response = match read_request(reader) {
            Ok(request) => self.handle(&request),
            Err(e) => RpcResponse::error(PROTOCOL_VERSION_PROBE, String::new(), e),
        };
        write_response(writer, &response)
    }

    /// Validate the protocol version and route the request to its operation.
    pub fn handle(&self, request: &RpcRequest) -> RpcResponse {
        let protocol_version = if request.op == names::PROBE {
            PROTOCOL_VERSION_PROBE
        } else {
            request.protocol_version
        };

        let result = validate_protocol_version(request).and_then(|()| self.dispatch(request));
        match &result {
            Ok(_) => tracing::debug!(op = %request.op, request_id = %request.request_id, "rpc ok"),
            Err(e) => tracing::info!(
                op = %request.op,
                request_id = %request.request_id,
                code = %e.code,
                "rpc failed: {}",
                e.message
            ),
        }
        RpcResponse::from_result(protocol_version, request.request_id.clone(), result)
    }

    fn dispatch(&self, request: &RpcRequest) -> Result<serde_json::Value, RpcError> {
        match request.op.as_str() {
            names::PROBE => to_payload(&self.probe()),
            names::SETTINGS_GET => {
                let payload: GetSettingsRequest = request.decode_payload()?;
                let view = self.service.get(&payload).map_err(|e| e.to_rpc_error())?;
                to_payload(&view)
            }
            names::SETTINGS_UPDATE => {
                let payload: UpdateSettingsRequest = request.decode_payload()?;
                let response = self.service.update(payload).map_err(|e| e.to_rpc_error())?;
                to_payload(&response)
            }
            other => Err(RpcError::unknown_operation(other)),
        }
    }

    fn probe(&self) -> ProbeResponse {
        ProbeResponse {
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_min: PROTOCOL_MIN,
            protocol_max: PROTOCOL_MAX,
            operations: names::ALL.iter().map(|op| op.to_string()).collect(),
            deeply_merged_fields: self.service.policy().fields().map(str::to_string).collect(),
        }
    }
}

fn read_request<R: BufRead>(reader: &mut R) -> Result<RpcRequest, RpcError> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| RpcError::invalid_request(format!("failed to read request: {}", e)))?;

    serde_json::from_str(&line).map_err(|e| RpcError::invalid_request(format!("invalid JSON: {}", e)))
}

/// probe only speaks version 0; everything else must be within range.
fn validate_protocol_version(request: &RpcRequest) -> Result<(), RpcError> {
    if request.op == names::PROBE {
        if request.protocol_version != PROTOCOL_VERSION_PROBE {
            return Err(RpcError::unsupported_protocol(
                request.protocol_version,
                PROTOCOL_VERSION_PROBE,
                PROTOCOL_VERSION_PROBE,
            ));
        }
        return Ok(());
    }

    if request.protocol_version < PROTOCOL_MIN || request.protocol_version > PROTOCOL_MAX {
        return Err(RpcError::unsupported_protocol(
            request.protocol_version,
            PROTOCOL_MIN,
            PROTOCOL_MAX,
        ));
    }
    Ok(())
}

fn to_payload<T: Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::invalid_request(format!("failed to encode response: {}", e)))
}

fn write_response<W: Write>(writer: &mut W, response: &RpcResponse) -> io::Result<()> {
    let json =
        serde_json::to_string(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)?;
    writer.flush()
}
