//! JSON error envelope shared by server and client.
//!
//! Successful responses carry Arrow IPC bytes. Failures carry
//! `{"error": {"kind", "code", "message", "data"}}` so the client can
//! rebuild the same [`TransportError`] variant the server raised.

use crate::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Top-level error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error object, in the JSON-RPC 2.0 error layout plus a `kind` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&TransportError> for ErrorResponse {
    fn from(err: &TransportError) -> Self {
        let data = match err {
            TransportError::UnknownCommand { token } => Some(json!({ "token": token })),
            TransportError::ShapeMismatch { name, shape, len } => {
                Some(json!({ "name": name, "shape": shape, "len": len }))
            }
            TransportError::InvalidInput { message }
            | TransportError::ComputeFailed { message }
            | TransportError::WireFormat { message, .. } => Some(json!({ "message": message })),
            _ => None,
        };

        Self {
            error: ErrorBody {
                kind: err.kind().to_string(),
                code: err.to_error_code(),
                message: err.to_string(),
                data,
            },
        }
    }
}

impl ErrorBody {
    fn field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }

    fn str_field(&self, key: &str) -> Option<String> {
        self.field(key).and_then(Value::as_str).map(String::from)
    }

    /// Rebuild the error variant the server reported.
    ///
    /// Unrecognized kinds become [`TransportError::TransportFailure`].
    pub fn to_error(&self) -> TransportError {
        let detail = || self.str_field("message").unwrap_or_else(|| self.message.clone());

        match self.kind.as_str() {
            "unknown_command" => TransportError::UnknownCommand {
                token: self.str_field("token").unwrap_or_default(),
            },
            "shape_mismatch" => TransportError::ShapeMismatch {
                name: self.str_field("name").unwrap_or_default(),
                shape: self
                    .field("shape")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default(),
                len: self
                    .field("len")
                    .and_then(Value::as_u64)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or_default(),
            },
            "invalid_input" => TransportError::InvalidInput { message: detail() },
            "compute_failed" => TransportError::ComputeFailed { message: detail() },
            "wire_format" => TransportError::WireFormat {
                message: detail(),
                source: None,
            },
            _ => TransportError::TransportFailure {
                message: format!("Server error {}: {}", self.code, self.message),
                source: None,
            },
        }
    }
}
