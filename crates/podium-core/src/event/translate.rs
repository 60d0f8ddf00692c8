//! Notification translation.
//!
//! [`translate`] is a pure function from a notification name plus its
//! positional payload to a [`ServerEvent`]. Each supported kind has a fixed
//! payload shape; the only liberty taken with the payload is scalar
//! coercion:
//!
//! | Target | Accepted JSON |
//! |--------|---------------|
//! | string | string |
//! | integer | number, numeric string |
//! | boolean | bool, `0` / `1`, `"true"` / `"false"` |
//!
//! Unknown notification names translate to `Ok(None)`.
//!
//! # Mode-script callbacks
//!
//! `ManiaPlanet.ModeScriptCallbackArray` carries `[name, [json]]` and
//! `ManiaPlanet.ModeScriptCallback` carries `[name, json]`. Both are
//! unwrapped to `(name, parsed json)` by [`unwrap_script_callback`] and then
//! mapped like any other notification: known script events get a typed
//! event, the rest become [`ModeScriptEvent`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::*;
use crate::error::{TranslateError, TranslateResult};
use crate::model::{MapStruct, PlayerRanking, PlayerStruct};

/// Notification and script-event names understood by the translator.
pub mod names {
    pub const PLAYER_CONNECT: &str = "ManiaPlanet.PlayerConnect";
    pub const PLAYER_DISCONNECT: &str = "ManiaPlanet.PlayerDisconnect";
    pub const PLAYER_CHAT: &str = "ManiaPlanet.PlayerChat";
    pub const BEGIN_MAP: &str = "ManiaPlanet.BeginMap";
    pub const END_MAP: &str = "ManiaPlanet.EndMap";
    pub const BEGIN_MATCH: &str = "ManiaPlanet.BeginMatch";
    pub const END_MATCH: &str = "ManiaPlanet.EndMatch";
    pub const BILL_UPDATED: &str = "ManiaPlanet.BillUpdated";
    pub const MAP_LIST_MODIFIED: &str = "ManiaPlanet.MapListModified";
    pub const MODE_SCRIPT_CALLBACK: &str = "ManiaPlanet.ModeScriptCallback";
    pub const MODE_SCRIPT_CALLBACK_ARRAY: &str = "ManiaPlanet.ModeScriptCallbackArray";
    pub const PLAYER_ALLIES_CHANGED: &str = "ManiaPlanet.PlayerAlliesChanged";
    pub const PLAYER_INFO_CHANGED: &str = "ManiaPlanet.PlayerInfoChanged";
    pub const PLAYER_MANIALINK_ANSWER: &str = "ManiaPlanet.PlayerManialinkPageAnswer";
    pub const STATUS_CHANGED: &str = "ManiaPlanet.StatusChanged";
    pub const TUNNEL_DATA_RECEIVED: &str = "ManiaPlanet.TunnelDataReceived";
    pub const VOTE_UPDATED: &str = "ManiaPlanet.VoteUpdated";
    pub const PLAYER_CHECKPOINT: &str = "TrackMania.PlayerCheckpoint";
    pub const PLAYER_FINISH: &str = "TrackMania.PlayerFinish";
    pub const PLAYER_INCOHERENCE: &str = "TrackMania.PlayerIncoherence";

    /// Script event carried inside the mode-script wrappers.
    pub const SCRIPT_WAYPOINT: &str = "Trackmania.Event.WayPoint";
}

/// Translates a raw notification into a typed event.
///
/// Returns `Ok(None)` for notification kinds the controller does not
/// handle, and an error when a supported kind arrives with a payload of the
/// wrong shape.
pub fn translate(name: &str, args: &[Value]) -> TranslateResult<Option<ServerEvent>> {
    let event = match name {
        names::PLAYER_CONNECT => {
            let a = Args::expect(name, args, 2)?;
            ServerEvent::PlayerConnect(PlayerConnect {
                login: a.string(0)?,
                is_spectator: a.boolean(1)?,
            })
        }
        names::PLAYER_DISCONNECT => {
            let a = Args::expect(name, args, 2)?;
            ServerEvent::PlayerDisconnect(PlayerDisconnect {
                login: a.string(0)?,
                reason: a.string(1)?,
            })
        }
        names::PLAYER_CHAT => {
            let a = Args::expect(name, args, 4)?;
            ServerEvent::PlayerChat(PlayerChat {
                player_uid: a.int(0)?,
                login: a.string(1)?,
                text: a.string(2)?,
                is_command: a.boolean(3)?,
            })
        }
        names::BEGIN_MAP => {
            let a = Args::expect(name, args, 1)?;
            let map = a.structure::<MapStruct>(0)?.into();
            ServerEvent::MapBegin(MapBegin { map })
        }
        names::END_MAP => {
            let a = Args::expect(name, args, 1)?;
            let map = a.structure::<MapStruct>(0)?.into();
            ServerEvent::MapEnd(MapEnd { map })
        }
        names::BEGIN_MATCH => {
            Args::expect(name, args, 0)?;
            ServerEvent::MatchBegin(MatchBegin)
        }
        names::END_MATCH => {
            let a = Args::expect(name, args, 2)?;
            ServerEvent::MatchEnd(MatchEnd {
                rankings: a.structure::<Vec<PlayerRanking>>(0)?,
                winner_team: a.int(1)?,
            })
        }
        names::BILL_UPDATED => {
            let a = Args::expect(name, args, 4)?;
            ServerEvent::BillUpdate(BillUpdate {
                bill_id: a.int(0)?,
                state: a.int(1)?,
                state_name: a.string(2)?,
                transaction_id: a.int(3)?,
            })
        }
        names::MAP_LIST_MODIFIED => {
            let a = Args::expect(name, args, 3)?;
            ServerEvent::MapListChange(MapListChange {
                current_index: a.int(0)?,
                next_index: a.int(1)?,
                is_list_modified: a.boolean(2)?,
            })
        }
        names::MODE_SCRIPT_CALLBACK | names::MODE_SCRIPT_CALLBACK_ARRAY => {
            let (sub_name, payload) = unwrap_script_callback(name, args)?;
            translate_script(&sub_name, payload)?
        }
        names::PLAYER_ALLIES_CHANGED => {
            let a = Args::expect(name, args, 1)?;
            ServerEvent::AllianceChange(AllianceChange {
                login: a.string(0)?,
            })
        }
        names::PLAYER_INFO_CHANGED => {
            let a = Args::expect(name, args, 1)?;
            let raw = a.structure::<PlayerStruct>(0)?;
            let (player_id, team_id) = (raw.player_id, raw.team_id);
            ServerEvent::PlayerInfoChange(PlayerInfoChange {
                player: raw.into(),
                player_id,
                team_id,
            })
        }
        names::PLAYER_MANIALINK_ANSWER => {
            let a = Args::expect(name, args, 4)?;
            let entries = a
                .structure::<Vec<EntryStruct>>(3)?
                .into_iter()
                .map(|e| (e.name, e.value))
                .collect();
            ServerEvent::ManialinkAnswer(ManialinkAnswer {
                player_uid: a.int(0)?,
                login: a.string(1)?,
                answer: a.string(2)?,
                entries,
            })
        }
        names::STATUS_CHANGED => {
            let a = Args::expect(name, args, 2)?;
            ServerEvent::StatusChange(StatusChange {
                code: a.int(0)?,
                name: a.string(1)?,
            })
        }
        names::TUNNEL_DATA_RECEIVED => {
            let a = Args::expect(name, args, 3)?;
            ServerEvent::TunnelData(TunnelData {
                player_uid: a.int(0)?,
                login: a.string(1)?,
                data: a.string(2)?,
            })
        }
        names::VOTE_UPDATED => {
            let a = Args::expect(name, args, 4)?;
            ServerEvent::VoteUpdate(VoteUpdate {
                state: a.string(0)?,
                login: a.string(1)?,
                command: a.string(2)?,
                param: a.string(3)?,
            })
        }
        names::PLAYER_CHECKPOINT => {
            let a = Args::expect(name, args, 5)?;
            ServerEvent::Checkpoint(Checkpoint {
                player_uid: a.int(0)?,
                login: a.string(1)?,
                time: a.int(2)?,
                lap: a.int(3)?,
                checkpoint_index: a.int(4)?,
            })
        }
        names::PLAYER_FINISH => {
            let a = Args::expect(name, args, 3)?;
            ServerEvent::Finish(Finish {
                player_uid: a.int(0)?,
                login: a.string(1)?,
                time: a.int(2)?,
            })
        }
        names::PLAYER_INCOHERENCE => {
            let a = Args::expect(name, args, 2)?;
            ServerEvent::Incoherence(Incoherence {
                player_uid: a.int(0)?,
                login: a.string(1)?,
            })
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Unwraps a mode-script callback into `(script event name, payload)`.
///
/// Accepts `[name, json]` for the plain wrapper and `[name, [json]]` for the
/// array wrapper. An empty JSON string yields `Value::Null`.
pub fn unwrap_script_callback(kind: &str, args: &[Value]) -> TranslateResult<(String, Value)> {
    let a = Args::expect(kind, args, 2)?;
    let sub_name = a.string(0)?;

    let encoded = if kind == names::MODE_SCRIPT_CALLBACK_ARRAY {
        match &args[1] {
            Value::Array(items) if items.len() == 1 => Args::expect(kind, items, 1)?.string(0)?,
            Value::Array(items) => {
                return Err(TranslateError::Payload {
                    kind: kind.to_string(),
                    reason: format!(
                        "script callback '{sub_name}' carries {} payload elements, expected 1",
                        items.len()
                    ),
                });
            }
            _ => {
                return Err(TranslateError::ArgumentType {
                    kind: kind.to_string(),
                    index: 1,
                    expected: "array",
                });
            }
        }
    } else {
        a.string(1)?
    };

    if encoded.trim().is_empty() {
        return Ok((sub_name, Value::Null));
    }

    let payload = serde_json::from_str(&encoded).map_err(|e| TranslateError::Payload {
        kind: sub_name.clone(),
        reason: e.to_string(),
    })?;
    Ok((sub_name, payload))
}

/// Maps an unwrapped script event to a typed event.
fn translate_script(name: &str, payload: Value) -> TranslateResult<ServerEvent> {
    match name {
        names::SCRIPT_WAYPOINT => {
            let raw: WaypointPayload =
                serde_json::from_value(payload).map_err(|e| TranslateError::Payload {
                    kind: name.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(ServerEvent::Waypoint(Waypoint {
                login: raw.login,
                race_time: raw.racetime,
                lap_time: raw.laptime,
                checkpoint_in_race: raw.checkpointinrace,
                checkpoint_in_lap: raw.checkpointinlap,
                is_end_race: raw.isendrace,
                is_end_lap: raw.isendlap,
            }))
        }
        _ => Ok(ServerEvent::ModeScript(ModeScriptEvent {
            name: name.to_string(),
            payload,
        })),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntryStruct {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct WaypointPayload {
    login: String,
    racetime: i64,
    #[serde(default)]
    laptime: i64,
    checkpointinrace: i64,
    #[serde(default)]
    checkpointinlap: i64,
    isendrace: bool,
    #[serde(default)]
    isendlap: bool,
}

// =============================================================================
// Positional argument access
// =============================================================================

/// Arity-checked view over a positional payload.
struct Args<'a> {
    kind: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn expect(kind: &'a str, values: &'a [Value], expected: usize) -> TranslateResult<Self> {
        if values.len() != expected {
            return Err(TranslateError::Arity {
                kind: kind.to_string(),
                expected,
                got: values.len(),
            });
        }
        Ok(Self { kind, values })
    }

    fn mismatch(&self, index: usize, expected: &'static str) -> TranslateError {
        TranslateError::ArgumentType {
            kind: self.kind.to_string(),
            index,
            expected,
        }
    }

    fn string(&self, index: usize) -> TranslateResult<String> {
        match &self.values[index] {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.mismatch(index, "a string")),
        }
    }

    fn int(&self, index: usize) -> TranslateResult<i64> {
        match &self.values[index] {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| self.mismatch(index, "an integer"))
    }

    fn boolean(&self, index: usize) -> TranslateResult<bool> {
        match &self.values[index] {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
        .ok_or_else(|| self.mismatch(index, "a boolean"))
    }

    fn structure<T: DeserializeOwned>(&self, index: usize) -> TranslateResult<T> {
        T::deserialize(&self.values[index]).map_err(|e| TranslateError::Payload {
            kind: self.kind.to_string(),
            reason: e.to_string(),
        })
    }
}
