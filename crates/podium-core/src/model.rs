//! Data model shared by every layer: players, maps and medals.
//!
//! The server reports players and maps as structs with PascalCase member
//! names. The `*Struct` types mirror those wire structs and convert into the
//! controller's own [`PlayerInfo`] and [`MapInfo`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Players
// =============================================================================

/// A connected player, keyed by login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Unique, stable identity.
    pub login: String,
    /// Display name (may contain formatting codes).
    pub nickname: String,
    /// Whether the player is currently spectating.
    pub is_spectator: bool,
}

impl PlayerInfo {
    /// Creates a player entry.
    pub fn new(login: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            nickname: nickname.into(),
            is_spectator: false,
        }
    }

    /// Creates a player entry whose display name is its login.
    pub fn from_login(login: impl Into<String>) -> Self {
        let login = login.into();
        Self::new(login.clone(), login)
    }

    /// Sets the spectator flag (builder pattern).
    pub fn spectator(mut self, is_spectator: bool) -> Self {
        self.is_spectator = is_spectator;
        self
    }
}

/// Player description as returned by `GetPlayerList`, `GetPlayerInfo` and
/// the player-info-changed callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerStruct {
    pub login: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub player_id: i64,
    #[serde(default)]
    pub team_id: i64,
    /// Decimal-packed status; the units digit is the spectator flag.
    #[serde(default)]
    pub spectator_status: i64,
    #[serde(default)]
    pub flags: i64,
}

impl PlayerStruct {
    /// Returns `true` when the packed spectator status marks a spectator.
    pub fn is_spectator(&self) -> bool {
        self.spectator_status % 10 != 0
    }
}

impl From<PlayerStruct> for PlayerInfo {
    fn from(raw: PlayerStruct) -> Self {
        let is_spectator = raw.is_spectator();
        let nickname = if raw.nick_name.is_empty() {
            raw.login.clone()
        } else {
            raw.nick_name
        };
        Self {
            login: raw.login,
            nickname,
            is_spectator,
        }
    }
}

/// One row of the end-of-match ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerRanking {
    pub login: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub best_time: i64,
    #[serde(default)]
    pub score: i64,
}

// =============================================================================
// Maps
// =============================================================================

/// Medal thresholds in milliseconds: `bronze >= silver >= gold >= author`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Medals {
    pub bronze: i64,
    pub silver: i64,
    pub gold: i64,
    pub author: i64,
}

/// A medal earned by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Medal {
    Bronze,
    Silver,
    Gold,
    Author,
}

impl Medals {
    /// Returns `true` when the cut-points are ordered as expected.
    pub fn is_ordered(&self) -> bool {
        self.bronze >= self.silver && self.silver >= self.gold && self.gold >= self.author
    }

    /// Returns the best medal reached by `time`, if any.
    pub fn medal_for(&self, time: i64) -> Option<Medal> {
        if time <= 0 {
            return None;
        }
        [
            (self.author, Medal::Author),
            (self.gold, Medal::Gold),
            (self.silver, Medal::Silver),
            (self.bronze, Medal::Bronze),
        ]
        .into_iter()
        .find(|(threshold, _)| *threshold > 0 && time <= *threshold)
        .map(|(_, medal)| medal)
    }
}

/// A map known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Unique map id.
    pub uid: String,
    pub name: String,
    /// Path relative to the server's maps directory.
    pub file_name: String,
    /// Author login.
    pub author: String,
    pub environment: String,
    pub mood: String,
    pub medals: Medals,
    pub lap_race: bool,
    pub nb_laps: u32,
    pub nb_checkpoints: u32,
    /// External catalog id; `None` when unknown.
    pub tmx_id: Option<u32>,
}

impl MapInfo {
    /// Creates a map with only its identifying fields filled in.
    pub fn new(
        uid: impl Into<String>,
        name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            file_name: file_name.into(),
            author: String::new(),
            environment: String::new(),
            mood: String::new(),
            medals: Medals::default(),
            lap_race: false,
            nb_laps: 0,
            nb_checkpoints: 0,
            tmx_id: None,
        }
    }
}

/// Map description as sent by the server (`SMapInfo`).
///
/// `UId`, `Name` and `FileName` are mandatory; list queries omit most of
/// the remaining members, so those default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapStruct {
    #[serde(rename = "UId")]
    pub uid: String,
    pub name: String,
    pub file_name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, rename = "Environnement")]
    pub environment: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub bronze_time: i64,
    #[serde(default)]
    pub silver_time: i64,
    #[serde(default)]
    pub gold_time: i64,
    #[serde(default)]
    pub author_time: i64,
    #[serde(default)]
    pub lap_race: bool,
    #[serde(default)]
    pub nb_laps: i64,
    #[serde(default)]
    pub nb_checkpoints: i64,
}

impl From<MapStruct> for MapInfo {
    fn from(raw: MapStruct) -> Self {
        Self {
            uid: raw.uid,
            name: raw.name,
            file_name: raw.file_name,
            author: raw.author,
            environment: raw.environment,
            mood: raw.mood,
            medals: Medals {
                bronze: raw.bronze_time,
                silver: raw.silver_time,
                gold: raw.gold_time,
                author: raw.author_time,
            },
            lap_race: raw.lap_race,
            nb_laps: u32::try_from(raw.nb_laps).unwrap_or(0),
            nb_checkpoints: u32::try_from(raw.nb_checkpoints).unwrap_or(0),
            tmx_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_medal_for_time() {
        let medals = Medals {
            bronze: 60_000,
            silver: 50_000,
            gold: 45_000,
            author: 42_000,
        };
        assert!(medals.is_ordered());
        assert_eq!(medals.medal_for(41_000), Some(Medal::Author));
        assert_eq!(medals.medal_for(44_000), Some(Medal::Gold));
        assert_eq!(medals.medal_for(59_999), Some(Medal::Bronze));
        assert_eq!(medals.medal_for(61_000), None);
        assert_eq!(medals.medal_for(0), None);
    }

    #[test]
    fn test_map_struct_conversion() {
        let raw: MapStruct = serde_json::from_value(json!({
            "UId": "abc",
            "Name": "Canyon A01",
            "FileName": "Campaigns/A01.Map.Gbx",
            "Author": "nadeo",
            "Environnement": "Canyon",
            "BronzeTime": 30000,
            "SilverTime": 25000,
            "GoldTime": 22000,
            "AuthorTime": 20000,
            "NbCheckpoints": 4
        }))
        .unwrap();
        let map = MapInfo::from(raw);
        assert_eq!(map.uid, "abc");
        assert_eq!(map.environment, "Canyon");
        assert_eq!(map.medals.author, 20000);
        assert_eq!(map.nb_checkpoints, 4);
        assert_eq!(map.tmx_id, None);
    }

    #[test]
    fn test_player_struct_spectator_flag() {
        let raw: PlayerStruct = serde_json::from_value(json!({
            "Login": "alice",
            "NickName": "$f00Alice",
            "SpectatorStatus": 2551101
        }))
        .unwrap();
        assert!(raw.is_spectator());
        let player = PlayerInfo::from(raw);
        assert_eq!(player.nickname, "$f00Alice");
        assert!(player.is_spectator);
    }

    #[test]
    fn test_player_without_nickname_uses_login() {
        let raw: PlayerStruct = serde_json::from_value(json!({ "Login": "bob" })).unwrap();
        assert_eq!(PlayerInfo::from(raw).nickname, "bob");
    }
}
