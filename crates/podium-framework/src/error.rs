//! Error types for the Podium framework.

use podium_core::RpcError;
use thiserror::Error;

// =============================================================================
// State Errors
// =============================================================================

/// Logic errors raised by the state store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A player with this login is already on the roster.
    #[error("player '{login}' is already on the roster")]
    DuplicatePlayer { login: String },
}

// =============================================================================
// Settings Errors
// =============================================================================

/// Rejections and failures of the settings reconciler.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// The mode configuration has no time limit to extend.
    #[error("the current mode has no time limit")]
    NotExtendable,

    /// The key is not part of the mode configuration.
    #[error("unknown setting '{key}'")]
    UnknownKey { key: String },

    /// The value under `key` is not an integer.
    #[error("setting '{key}' is not numeric")]
    NotNumeric { key: String },

    /// The new value of `key` would not fit in an integer.
    #[error("setting '{key}' would overflow")]
    OutOfRange { key: String },

    /// The server rejected or failed the request.
    #[error("remote settings call failed: {0}")]
    Remote(#[from] RpcError),
}

// =============================================================================
// Registration Errors
// =============================================================================

/// Reasons a command definition is refused by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The command name is empty.
    #[error("command name is empty")]
    EmptyName,

    /// The command name contains characters that cannot be typed as one word.
    #[error("invalid command name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The name is the reserved privileged-dispatch keyword.
    #[error("'{name}' is reserved for privileged command dispatch")]
    ReservedName { name: String },

    /// The description is empty.
    #[error("command '{name}' has no description")]
    EmptyDescription { name: String },

    /// A command with this name already exists in the same registry.
    #[error("{registry} command '{name}' is already registered by '{owner}'")]
    Duplicate {
        name: String,
        owner: String,
        /// `"regular"` or `"privileged"`.
        registry: &'static str,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Result type for settings reconciler operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type for command registration.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
