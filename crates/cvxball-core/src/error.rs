//! Error types for the array transport.
//!
//! Every failure a caller can observe, locally or across the wire, is one of
//! these variants. The server maps them onto HTTP statuses and a JSON error
//! body; the client maps that body back onto the same variant.

use arrow_schema::ArrowError;
use thiserror::Error;

/// Main error type for the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    // Decode errors
    #[error("Shape mismatch for array '{name}': shape {shape:?} does not match {len} values")]
    ShapeMismatch {
        name: String,
        shape: Vec<i64>,
        len: usize,
    },

    #[error("Wire format error: {message}")]
    WireFormat {
        message: String,
        #[source]
        source: Option<ArrowError>,
    },

    // Store errors
    #[error("No data found for command: {token}")]
    UnknownCommand { token: String },

    // Compute errors
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Computation failed: {message}")]
    ComputeFailed { message: String },

    // Transport errors
    #[error("Transport failure: {message}")]
    TransportFailure {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

impl From<ArrowError> for TransportError {
    fn from(err: ArrowError) -> Self {
        TransportError::WireFormat {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::TransportFailure {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::Config {
            message: format!("Invalid server URL: {}", err),
        }
    }
}

impl TransportError {
    /// Create a wire format error without an underlying Arrow cause.
    pub fn wire_format(message: impl Into<String>) -> Self {
        TransportError::WireFormat {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        TransportError::InvalidInput {
            message: message.into(),
        }
    }

    /// Stable snake_case name of the error kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::ShapeMismatch { .. } => "shape_mismatch",
            TransportError::WireFormat { .. } => "wire_format",
            TransportError::UnknownCommand { .. } => "unknown_command",
            TransportError::InvalidInput { .. } => "invalid_input",
            TransportError::ComputeFailed { .. } => "compute_failed",
            TransportError::TransportFailure { .. } => "transport_failure",
            TransportError::Io { .. } => "io",
            TransportError::Json { .. } => "json",
            TransportError::Config { .. } => "config",
        }
    }

    /// HTTP status the server answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TransportError::UnknownCommand { .. } => 404,
            TransportError::WireFormat { .. } | TransportError::Json { .. } => 400,
            TransportError::ShapeMismatch { .. } | TransportError::InvalidInput { .. } => 422,
            _ => 500,
        }
    }

    /// Convert to a numeric error code.
    ///
    /// Codes follow the JSON-RPC application range:
    /// - -32000: Transport failure
    /// - -32001: Unknown command
    /// - -32002: Shape mismatch
    /// - -32003: Invalid input
    /// - -32004: Computation failed
    /// - -32005: Wire format error
    /// - -32603: Internal error
    pub fn to_error_code(&self) -> i32 {
        match self {
            TransportError::TransportFailure { .. } => -32000,
            TransportError::UnknownCommand { .. } => -32001,
            TransportError::ShapeMismatch { .. } => -32002,
            TransportError::InvalidInput { .. } => -32003,
            TransportError::ComputeFailed { .. } => -32004,
            TransportError::WireFormat { .. } | TransportError::Json { .. } => -32005,
            _ => -32603,
        }
    }

    /// Check if a caller could reasonably retry the request.
    ///
    /// The transport itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::TransportFailure { .. })
    }
}
