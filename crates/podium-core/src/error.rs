//! Unified error types for the Podium core.
//!
//! Framework-level errors (state, settings, command registration) are
//! defined in `podium-framework`; runtime and configuration errors live in
//! `podium-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by a transport implementation itself.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// RPC Errors
// =============================================================================

/// Error type for remote procedure calls issued to the game server.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The transport is not connected.
    #[error("transport is not connected")]
    NotConnected,
    /// The call timed out.
    #[error("remote call timed out")]
    Timeout,
    /// The server answered with a fault.
    #[error("remote fault ({code}): {message}")]
    Fault { code: i64, message: String },
    /// The response could not be interpreted.
    #[error("unexpected response to {method}: {reason}")]
    UnexpectedResponse { method: String, reason: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RpcError {
    /// Creates an [`RpcError::UnexpectedResponse`].
    pub fn unexpected(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Translation Errors
// =============================================================================

/// A notification payload did not match the shape expected for its kind.
///
/// The dispatcher drops the offending notification and logs this error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// Wrong number of positional arguments.
    #[error("{kind}: expected {expected} argument(s), got {got}")]
    Arity {
        kind: String,
        expected: usize,
        got: usize,
    },

    /// A positional argument has the wrong type and cannot be coerced.
    #[error("{kind}: argument {index} should be {expected}")]
    ArgumentType {
        kind: String,
        index: usize,
        expected: &'static str,
    },

    /// A structured argument or mode-script payload is malformed.
    #[error("{kind}: malformed payload: {reason}")]
    Payload { kind: String, reason: String },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a storage backend.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// I/O error while reading or writing a collection.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A collection could not be (de)serialized.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// The collection name cannot be used by this backend.
    #[error("invalid collection name: {0}")]
    InvalidCollection(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for remote procedure calls.
pub type RpcResult<T> = Result<T, RpcError>;

/// Result type for notification translation.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
