//! Configuration module for the Podium runtime.
//!
//! Configuration is layered with figment (defaults, profile file, main file,
//! `PODIUM_*` environment variables) and validated before the runtime starts.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ControllerConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PodiumConfig,
    ServerConfig, SpanEventConfig, StorageBackend, StorageConfig,
};
pub use validation::validate_config;
