//! Typed server events.
//!
//! Every notification kind the controller understands has a plain struct
//! here, and [`ServerEvent`] is the closed set of them. Events are produced
//! by [`translate`] and handed to plugin hooks by reference.
//!
//! ```text
//! (name, [Value]) ──translate──▶ ServerEvent ──dispatch──▶ Plugin::on_*
//! ```

mod translate;

pub use translate::{names, translate, unwrap_script_callback};

use serde::Serialize;
use serde_json::Value;

use crate::model::{MapInfo, PlayerInfo, PlayerRanking};

/// A player joined the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerConnect {
    pub login: String,
    pub is_spectator: bool,
}

/// A player left the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDisconnect {
    pub login: String,
    pub reason: String,
}

/// A chat line, including slash commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerChat {
    /// Server-side id of the sender; `0` for the server itself.
    pub player_uid: i64,
    pub login: String,
    pub text: String,
    /// Set by the server when the line is a registered chat command.
    pub is_command: bool,
}

impl PlayerChat {
    /// Returns `true` for lines sent by the server itself.
    pub fn is_server_message(&self) -> bool {
        self.player_uid == 0
    }
}

/// A map started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapBegin {
    pub map: MapInfo,
}

/// A map ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEnd {
    pub map: MapInfo,
}

/// A match started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchBegin;

/// A match ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEnd {
    pub rankings: Vec<PlayerRanking>,
    pub winner_team: i64,
}

/// A planets bill changed state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillUpdate {
    pub bill_id: i64,
    pub state: i64,
    pub state_name: String,
    pub transaction_id: i64,
}

/// The server map list changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapListChange {
    pub current_index: i64,
    pub next_index: i64,
    pub is_list_modified: bool,
}

/// A mode-script callback without a dedicated typed event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeScriptEvent {
    pub name: String,
    pub payload: Value,
}

/// A player's allies changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllianceChange {
    pub login: String,
}

/// Player details changed (nickname, team, spectator status).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerInfoChange {
    pub player: PlayerInfo,
    pub player_id: i64,
    pub team_id: i64,
}

/// A player answered a manialink page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManialinkAnswer {
    pub player_uid: i64,
    pub login: String,
    pub answer: String,
    /// `(name, value)` pairs of the page's entry fields.
    pub entries: Vec<(String, String)>,
}

impl ManialinkAnswer {
    /// Looks up an entry value by name.
    pub fn entry(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The server status changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub code: i64,
    pub name: String,
}

/// Raw tunnel data received from a player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TunnelData {
    pub player_uid: i64,
    pub login: String,
    pub data: String,
}

/// A callvote changed state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteUpdate {
    pub state: String,
    pub login: String,
    pub command: String,
    pub param: String,
}

/// A player crossed a waypoint (script API).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub login: String,
    pub race_time: i64,
    pub lap_time: i64,
    pub checkpoint_in_race: i64,
    pub checkpoint_in_lap: i64,
    pub is_end_race: bool,
    pub is_end_lap: bool,
}

/// A player crossed a checkpoint (legacy callback).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checkpoint {
    pub player_uid: i64,
    pub login: String,
    pub time: i64,
    pub lap: i64,
    pub checkpoint_index: i64,
}

/// A player finished, or retired with `time == 0` (legacy callback).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finish {
    pub player_uid: i64,
    pub login: String,
    pub time: i64,
}

impl Finish {
    /// A zero time means the player gave up rather than finished.
    pub fn is_retire(&self) -> bool {
        self.time == 0
    }
}

/// The server flagged a run as incoherent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incoherence {
    pub player_uid: i64,
    pub login: String,
}

/// Every event the controller dispatches to plugins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    PlayerConnect(PlayerConnect),
    PlayerDisconnect(PlayerDisconnect),
    PlayerChat(PlayerChat),
    MapBegin(MapBegin),
    MapEnd(MapEnd),
    MatchBegin(MatchBegin),
    MatchEnd(MatchEnd),
    BillUpdate(BillUpdate),
    MapListChange(MapListChange),
    ModeScript(ModeScriptEvent),
    AllianceChange(AllianceChange),
    PlayerInfoChange(PlayerInfoChange),
    ManialinkAnswer(ManialinkAnswer),
    StatusChange(StatusChange),
    TunnelData(TunnelData),
    VoteUpdate(VoteUpdate),
    Waypoint(Waypoint),
    Checkpoint(Checkpoint),
    Finish(Finish),
    Incoherence(Incoherence),
}

impl ServerEvent {
    /// Returns the human-readable name of this event type.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::PlayerConnect(_) => "player_connect",
            Self::PlayerDisconnect(_) => "player_disconnect",
            Self::PlayerChat(_) => "player_chat",
            Self::MapBegin(_) => "map_begin",
            Self::MapEnd(_) => "map_end",
            Self::MatchBegin(_) => "match_begin",
            Self::MatchEnd(_) => "match_end",
            Self::BillUpdate(_) => "bill_update",
            Self::MapListChange(_) => "map_list_change",
            Self::ModeScript(_) => "mode_script",
            Self::AllianceChange(_) => "alliance_change",
            Self::PlayerInfoChange(_) => "player_info_change",
            Self::ManialinkAnswer(_) => "manialink_answer",
            Self::StatusChange(_) => "status_change",
            Self::TunnelData(_) => "tunnel_data",
            Self::VoteUpdate(_) => "vote_update",
            Self::Waypoint(_) => "waypoint",
            Self::Checkpoint(_) => "checkpoint",
            Self::Finish(_) => "finish",
            Self::Incoherence(_) => "incoherence",
        }
    }

    /// Returns the login this event concerns, when there is one.
    pub fn login(&self) -> Option<&str> {
        match self {
            Self::PlayerConnect(e) => Some(&e.login),
            Self::PlayerDisconnect(e) => Some(&e.login),
            Self::PlayerChat(e) => Some(&e.login),
            Self::AllianceChange(e) => Some(&e.login),
            Self::PlayerInfoChange(e) => Some(&e.player.login),
            Self::ManialinkAnswer(e) => Some(&e.login),
            Self::TunnelData(e) => Some(&e.login),
            Self::VoteUpdate(e) => Some(&e.login),
            Self::Waypoint(e) => Some(&e.login),
            Self::Checkpoint(e) => Some(&e.login),
            Self::Finish(e) => Some(&e.login),
            Self::Incoherence(e) => Some(&e.login),
            _ => None,
        }
    }
}
