//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use podium_framework::{DEFAULT_MATCH_SETTINGS_FILE, DEFAULT_PRIVILEGED_KEYWORD};

/// Root configuration structure.
///
/// ```toml
/// [server]
/// url = "ws://127.0.0.1:5001"
/// login = "SuperAdmin"
/// password = "SuperAdmin"
///
/// [controller]
/// admins = ["my-login"]
///
/// [plugins.greeter]
/// message = "Welcome!"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PodiumConfig {
    /// Dedicated server connection.
    #[serde(default)]
    pub server: ServerConfig,

    /// Controller behaviour.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Persistence backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-plugin sections, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, Value>,
}

// =============================================================================
// Server
// =============================================================================

/// Dedicated server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// URL of the XML-RPC bridge.
    #[serde(default = "default_server_url")]
    pub url: String,

    /// Remote administration login.
    #[serde(default = "default_super_admin")]
    pub login: String,

    /// Remote administration password.
    #[serde(default = "default_super_admin")]
    pub password: String,

    /// Script API version requested at startup.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Timeout for a single remote call in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            login: default_super_admin(),
            password: default_super_admin(),
            api_version: default_api_version(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_server_url() -> String {
    "ws://127.0.0.1:5001".to_string()
}

fn default_super_admin() -> String {
    "SuperAdmin".to_string()
}

fn default_api_version() -> String {
    "2023-03-24".to_string()
}

fn default_timeout_ms() -> u64 {
    30000
}

// =============================================================================
// Controller
// =============================================================================

/// Controller behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Logins allowed to run privileged commands.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Keyword introducing privileged commands (`/admin <name>`).
    #[serde(default = "default_command_keyword")]
    pub command_keyword: String,

    /// File name used when saving match settings.
    #[serde(default = "default_match_settings_file")]
    pub match_settings_file: String,

    /// Seconds added by `/admin extend` without an argument.
    #[serde(default = "default_extend_seconds")]
    pub extend_seconds: i64,

    /// Whether the built-in jukebox plugin is registered.
    #[serde(default = "default_enabled")]
    pub jukebox: bool,

    /// Whether the built-in admin and help commands are registered.
    #[serde(default = "default_enabled")]
    pub admin_commands: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            command_keyword: default_command_keyword(),
            match_settings_file: default_match_settings_file(),
            extend_seconds: default_extend_seconds(),
            jukebox: true,
            admin_commands: true,
        }
    }
}

fn default_command_keyword() -> String {
    DEFAULT_PRIVILEGED_KEYWORD.to_string()
}

fn default_match_settings_file() -> String {
    DEFAULT_MATCH_SETTINGS_FILE.to_string()
}

fn default_extend_seconds() -> i64 {
    300
}

fn default_enabled() -> bool {
    true
}

// =============================================================================
// Storage
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Volatile in-process storage.
    #[default]
    Memory,
    /// One JSON file per collection.
    File,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Data directory of the `file` backend.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data")
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// File rotation policy for `output = "file"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `podium_transport = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
