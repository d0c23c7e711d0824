//! Response codec for inbound control requests
//!
//! Builds `control_response` lines and converts callback results into their
//! wire payloads.

use crate::error::Result;
use ctrlwire_protocol::control::{ControlResponse, ControlResponseEnvelope, encode_line};
use ctrlwire_protocol::hooks::{ASYNC_KEY, CONTINUE_KEY};
use ctrlwire_protocol::{HookOutput, PermissionResult, RequestId};
use serde_json::{Map, Value};

/// Internal hook output keys and the wire names they are written as
///
/// Only top-level keys are rewritten; nested objects such as
/// `hookSpecificOutput` pass through untouched.
pub(crate) const RESERVED_FIELD_RENAMES: [(&str, &str); 2] =
    [(ASYNC_KEY, "async"), (CONTINUE_KEY, "continue")];

/// Convert hook output to its wire payload
pub(crate) fn hook_payload(output: HookOutput) -> Value {
    let mut map: Map<String, Value> = output.into_map();
    for (internal, wire) in RESERVED_FIELD_RENAMES {
        if let Some(value) = map.remove(internal) {
            map.insert(wire.to_string(), value);
        }
    }
    Value::Object(map)
}

/// Convert a permission decision to its wire payload
pub(crate) fn permission_payload(result: &PermissionResult) -> Result<Value> {
    Ok(serde_json::to_value(result).map_err(ctrlwire_protocol::ProtocolError::from)?)
}

/// Encode a success response line
pub(crate) fn success_line(request_id: RequestId, payload: Value) -> Result<String> {
    Ok(encode_line(&ControlResponseEnvelope {
        response: ControlResponse::success(request_id, payload),
    })?)
}

/// Encode an error response line
pub(crate) fn error_line(request_id: RequestId, message: impl Into<String>) -> Result<String> {
    Ok(encode_line(&ControlResponseEnvelope {
        response: ControlResponse::error(request_id, message),
    })?)
}
