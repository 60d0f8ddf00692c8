//! Runtime error types.

use thiserror::Error;

use podium_core::{RpcError, StorageError, TransportError};

use crate::config::ConfigError;

/// Fatal errors raised while starting or running the controller.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport could not be established.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A session negotiation step failed.
    #[error("Session negotiation failed at {step}: {source}")]
    Session {
        step: &'static str,
        #[source]
        source: RpcError,
    },

    /// The server rejected the credentials.
    #[error("Authentication rejected for login '{login}'")]
    AuthenticationRejected { login: String },

    /// Initial state could not be loaded.
    #[error("Initial load failed at {step}: {source}")]
    InitialLoad {
        step: &'static str,
        #[source]
        source: RpcError,
    },

    /// Storage backend could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No transport was configured and the WebSocket client is disabled.
    #[error("No transport available: {0}")]
    NoTransport(String),
}

impl RuntimeError {
    pub(crate) fn session(step: &'static str) -> impl FnOnce(RpcError) -> Self {
        move |source| Self::Session { step, source }
    }

    pub(crate) fn initial_load(step: &'static str) -> impl FnOnce(RpcError) -> Self {
        move |source| Self::InitialLoad { step, source }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
