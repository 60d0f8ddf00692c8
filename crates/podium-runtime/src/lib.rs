//! Podium Runtime - orchestration layer for the Podium controller.
//!
//! This crate provides:
//! - Layered configuration (`PodiumConfig`, `ConfigLoader`)
//! - Logging configuration (`LoggingBuilder`)
//! - Session negotiation and the initial state load
//! - The built-in administration commands (`AdminPlugin`)
//! - Runtime orchestration (`PodiumRuntime`)
//!
//! # Transport
//!
//! With the `ws-client` feature (default) the runtime connects to the
//! dedicated server bridge over WebSocket using `server.url`. A prepared
//! transport can be supplied instead with
//! [`PodiumRuntime::with_transport`].
//!
//! ```ignore
//! use podium_runtime::PodiumRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PodiumRuntime::builder().build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod session;

// Re-exports
pub use admin::AdminPlugin;
pub use config::{ConfigError, ConfigLoader, ConfigResult, PodiumConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{PodiumRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros and `Level`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
