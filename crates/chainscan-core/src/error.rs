//! Error types for transports and scans.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to a single endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed before a status was received (connection refused,
    /// DNS failure, socket timeout, …).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Response was well-formed JSON but not the shape we expected.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// The HTTP status code, if the endpoint answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The JSON-RPC error code, if the node returned a protocol error.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Errors surfaced by a scan call.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No usable endpoint, or otherwise unusable configuration. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The resume cursor supplied by the caller is not a block height.
    #[error("invalid cursor {0:?}: expected a decimal block height")]
    InvalidCursor(String),

    /// Every endpoint exhausted its retry budget; carries the last error seen.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ScanError {
    /// Returns `true` for errors caused by the caller's configuration
    /// rather than the backend.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidCursor(_))
    }
}
