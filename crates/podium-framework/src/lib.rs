//! # Podium Framework
//!
//! The controller proper, built on the core types:
//!
//! - [`ServerState`]: the roster, map list, current map and mode configuration
//! - [`SettingsReconciler`]: default vs temporary mode-script settings
//! - [`Jukebox`]: the player-requested map queue
//! - [`CommandRegistry`]: regular and privileged chat commands
//! - [`Dispatcher`]: turns notifications into state updates, command runs
//!   and plugin hook calls
//!
//! Plugins implement [`Plugin`] and receive a `&mut` [`Controller`] in every
//! hook.

pub mod builtin;
pub mod command;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod jukebox;
pub mod plugin;
pub mod remote;
pub mod settings;
pub mod state;

pub use command::{
    CommandDefinition, CommandHandler, CommandInvocation, CommandRegistry,
    DEFAULT_PRIVILEGED_KEYWORD, Registrar,
};
pub use controller::{Controller, DEFAULT_MATCH_SETTINGS_FILE};
pub use dispatcher::{Dispatcher, DispatcherState};
pub use error::{
    RegistrationError, RegistrationResult, SettingsError, SettingsResult, StateError, StateResult,
};
pub use jukebox::{Jukebox, JukeboxEntry};
pub use plugin::{BoxedPlugin, Plugin, PluginLoadContext, PluginLoadState};
pub use remote::Remote;
pub use settings::{ModeConfiguration, SettingsMap, SettingsReconciler, TIME_LIMIT_KEY};
pub use state::{PathHints, ServerState, ServerStatus, ServerVersion};

/// Prelude for plugin authors.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use podium_core::prelude::*;

    pub use super::command::{CommandHandler, CommandInvocation};
    pub use super::controller::Controller;
    pub use super::plugin::{Plugin, PluginLoadContext};
    pub use super::state::ServerState;
}
