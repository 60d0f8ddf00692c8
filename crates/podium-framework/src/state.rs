//! The state store.
//!
//! [`ServerState`] is the single authoritative snapshot of the server: the
//! roster, the current map, the map list and the mode configuration. It is
//! built once by the initial load and then only mutated by the dispatcher
//! between hook invocations; hooks see it through
//! [`Controller::state`](crate::Controller::state), which is read-only.

use serde::{Deserialize, Serialize};

use podium_core::{MapInfo, PlayerInfo};

use crate::error::{StateError, StateResult};
use crate::settings::{ModeConfiguration, TIME_LIMIT_KEY};

/// Server status as reported by `GetStatus` and the status-changed callback.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerStatus {
    pub code: i64,
    pub name: String,
}

impl ServerStatus {
    /// Status code of a server that is running a map.
    pub const RUNNING_PLAY: i64 = 4;

    pub fn is_playing(&self) -> bool {
        self.code == Self::RUNNING_PLAY
    }
}

/// Remote server identity as reported by `GetVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build: String,
    #[serde(default)]
    pub api_version: String,
}

/// Filesystem locations on the server host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathHints {
    pub maps_directory: String,
    pub user_data_directory: String,
}

/// Live server snapshot.
#[derive(Debug, Default)]
pub struct ServerState {
    players: Vec<PlayerInfo>,
    current_map: Option<MapInfo>,
    maps: Vec<MapInfo>,
    pub(crate) mode: ModeConfiguration,
    status: ServerStatus,
    pub(crate) paths: PathHints,
    version: Option<ServerVersion>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Roster ──────────────────────────────────────────────────────────────

    /// Adds a player. Logins are unique; a second entry is refused.
    pub fn add_player(&mut self, info: PlayerInfo) -> StateResult<()> {
        if self.is_online(&info.login) {
            return Err(StateError::DuplicatePlayer { login: info.login });
        }
        self.players.push(info);
        Ok(())
    }

    /// Removes and returns the player with this login, if present.
    pub fn remove_player(&mut self, login: &str) -> Option<PlayerInfo> {
        let index = self.players.iter().position(|p| p.login == login)?;
        Some(self.players.remove(index))
    }

    pub fn get_player(&self, login: &str) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.login == login)
    }

    pub fn is_online(&self, login: &str) -> bool {
        self.get_player(login).is_some()
    }

    /// Replaces the details of a present player. Returns `false` when the
    /// login is not on the roster.
    pub fn update_player(&mut self, info: PlayerInfo) -> bool {
        match self.players.iter_mut().find(|p| p.login == info.login) {
            Some(slot) => {
                *slot = info;
                true
            }
            None => false,
        }
    }

    /// Connected players in connection order.
    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Replaces the roster wholesale. Duplicate logins keep their first entry.
    pub fn set_players(&mut self, players: impl IntoIterator<Item = PlayerInfo>) {
        self.players.clear();
        for player in players {
            let _ = self.add_player(player);
        }
    }

    // ─── Maps ────────────────────────────────────────────────────────────────

    pub fn set_current_map(&mut self, map: MapInfo) {
        self.current_map = Some(map);
    }

    pub fn current_map(&self) -> Option<&MapInfo> {
        self.current_map.as_ref()
    }

    pub fn set_maps(&mut self, maps: Vec<MapInfo>) {
        self.maps = maps;
    }

    /// The server's map list.
    pub fn maps(&self) -> &[MapInfo] {
        &self.maps
    }

    pub fn find_map(&self, uid: &str) -> Option<&MapInfo> {
        self.maps.iter().find(|m| m.uid == uid)
    }

    // ─── Mode configuration ──────────────────────────────────────────────────

    pub fn mode(&self) -> &ModeConfiguration {
        &self.mode
    }

    /// Installs the mode configuration loaded from the server.
    pub fn set_mode(&mut self, mode: ModeConfiguration) {
        self.mode = mode;
    }

    /// `true` iff the mode configuration has a time limit key.
    pub fn is_time_extendable(&self) -> bool {
        self.mode.contains(TIME_LIMIT_KEY)
    }

    // ─── Server ──────────────────────────────────────────────────────────────

    pub fn status(&self) -> &ServerStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: ServerStatus) {
        self.status = status;
    }

    pub fn paths(&self) -> &PathHints {
        &self.paths
    }

    pub fn set_paths(&mut self, paths: PathHints) {
        self.paths = paths;
    }

    pub fn version(&self) -> Option<&ServerVersion> {
        self.version.as_ref()
    }

    pub fn set_version(&mut self, version: ServerVersion) {
        self.version = Some(version);
    }
}
