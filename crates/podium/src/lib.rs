//! # Podium
//!
//! A plugin-driven controller for ManiaPlanet and Trackmania dedicated
//! servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  notifications  ┌────────────┐  hooks  ┌───────────────────┐
//! │ Transport │────────────────▶│ Dispatcher │────────▶│ Plugin "jukebox"  │
//! │ (bridge)  │◀────────────────│            │────────▶│ Plugin "admin"    │
//! └───────────┘   RPC calls     └────────────┘────────▶│ Plugin ...        │
//!                                     │                └───────────────────┘
//!                                     ▼
//!                      ServerState · Settings · Jukebox · Commands
//! ```
//!
//! - **Transport**: JSON bridge to the dedicated server (WebSocket client)
//! - **Dispatcher**: translates notifications, updates state, runs chat
//!   commands and calls plugin hooks one at a time
//! - **Plugins**: override the hooks they need; a failing hook is logged and
//!   never affects other plugins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use podium::prelude::*;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     async fn on_player_connect(
//!         &mut self,
//!         ctl: &mut Controller,
//!         event: &PlayerConnect,
//!     ) -> anyhow::Result<()> {
//!         ctl.remote().chat_send(format!("Welcome {}!", event.login)).await?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     PodiumRuntime::builder().build()?.with_plugin(Greeter).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log format
//! - `ws-client` (default): WebSocket bridge client

pub use podium_core as core;
pub use podium_framework as framework;
pub use podium_runtime as runtime;
#[cfg(feature = "ws-client")]
pub use podium_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use podium::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use podium_runtime::{PodiumConfig, PodiumRuntime};

    // Plugin system, events and core types
    pub use podium_framework::prelude::*;
    pub use podium_framework::{CommandRegistry, Remote, Registrar};
}
