//! The capability object handed to hooks and command handlers.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use podium_core::{BoxedTransport, MemoryStorage, Storage};

use crate::command::{CommandRegistry, Registrar};
use crate::jukebox::Jukebox;
use crate::remote::Remote;
use crate::settings::{SettingsReconciler, match_settings_path};
use crate::state::ServerState;

/// Default file name used by `SaveMatchSettings`.
pub const DEFAULT_MATCH_SETTINGS_FILE: &str = "podium.txt";

/// Everything a hook may touch.
///
/// Hooks receive `&mut Controller` for the duration of one invocation and
/// cannot keep it, so no plugin can mutate shared state outside the
/// dispatcher's turn. The state store itself is read-only here; the
/// dispatcher applies notification-driven mutations before hooks run.
pub struct Controller {
    state: ServerState,
    jukebox: Jukebox,
    commands: CommandRegistry,
    remote: Remote,
    storage: Arc<dyn Storage>,
    admins: HashSet<String>,
    match_settings_file: String,
    shutdown_requested: bool,
}

impl Controller {
    /// Creates a controller over `transport` with an in-memory storage and
    /// no administrators.
    pub fn new(transport: BoxedTransport, state: ServerState) -> Self {
        Self {
            state,
            jukebox: Jukebox::new(),
            commands: CommandRegistry::default(),
            remote: Remote::new(transport),
            storage: Arc::new(MemoryStorage::new()),
            admins: HashSet::new(),
            match_settings_file: DEFAULT_MATCH_SETTINGS_FILE.to_string(),
            shutdown_requested: false,
        }
    }

    /// Sets the storage backend (builder pattern).
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Sets the administrator logins (builder pattern).
    pub fn with_admins<I, S>(mut self, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admins = admins.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the match settings file name (builder pattern).
    pub fn with_match_settings_file(mut self, file: impl Into<String>) -> Self {
        self.match_settings_file = file.into();
        self
    }

    /// Sets the privileged-dispatch keyword (builder pattern).
    ///
    /// Must be called before any command is registered.
    pub fn with_command_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.commands = CommandRegistry::new(keyword);
        self
    }

    // ─── State ───────────────────────────────────────────────────────────────

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut ServerState {
        &mut self.state
    }

    /// Returns a settings reconciler bound to the live mode configuration.
    pub fn settings(&mut self) -> SettingsReconciler<'_> {
        let save_path =
            match_settings_path(&self.state.paths.maps_directory, &self.match_settings_file);
        SettingsReconciler::new(&mut self.state.mode, &self.remote, save_path)
    }

    pub fn jukebox(&self) -> &Jukebox {
        &self.jukebox
    }

    pub fn jukebox_mut(&mut self) -> &mut Jukebox {
        &mut self.jukebox
    }

    // ─── Commands ────────────────────────────────────────────────────────────

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub(crate) fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    /// Returns a registrar that stamps commands with `owner`.
    pub fn registrar(&mut self, owner: &str) -> Registrar<'_> {
        Registrar::new(&mut self.commands, owner)
    }

    // ─── Services ────────────────────────────────────────────────────────────

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn is_admin(&self, login: &str) -> bool {
        self.admins.contains(login)
    }

    pub fn admins(&self) -> impl Iterator<Item = &str> {
        self.admins.iter().map(String::as_str)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Asks the dispatcher to shut down once the current notification has
    /// been handled.
    pub fn request_shutdown(&mut self) {
        if !self.shutdown_requested {
            info!("Shutdown requested");
        }
        self.shutdown_requested = true;
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }
}
