//! Typed helpers over the transport.
//!
//! [`Remote`] wraps a [`BoxedTransport`] and gives the remote procedures the
//! controller uses a typed signature. Anything not covered here is reachable
//! through [`Remote::call`].

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::trace;

use podium_core::{BoxedTransport, MapInfo, MapStruct, PlayerStruct, RpcError, RpcResult};

use crate::settings::SettingsMap;
use crate::state::{ServerStatus, ServerVersion};

/// Page size used for list queries.
pub const LIST_PAGE_SIZE: i64 = 5000;

/// Cloneable handle for issuing remote calls.
#[derive(Clone)]
pub struct Remote {
    transport: BoxedTransport,
}

impl Remote {
    pub fn new(transport: BoxedTransport) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    /// Issues a raw call.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        trace!(method, "remote call");
        self.transport.call(method, params).await
    }

    /// Issues a call and deserializes its result.
    pub async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::unexpected(method, e.to_string()))
    }

    // ─── Chat ────────────────────────────────────────────────────────────────

    /// Sends a message to every player.
    pub async fn chat_send(&self, message: impl Into<String>) -> RpcResult<()> {
        self.call("ChatSendServerMessage", vec![json!(message.into())])
            .await
            .map(drop)
    }

    /// Sends a message to a single player.
    pub async fn chat_send_to(
        &self,
        login: impl Into<String>,
        message: impl Into<String>,
    ) -> RpcResult<()> {
        self.call(
            "ChatSendServerMessageToLogin",
            vec![json!(message.into()), json!(login.into())],
        )
        .await
        .map(drop)
    }

    // ─── Map flow ────────────────────────────────────────────────────────────

    /// Sets the map played after the current one.
    pub async fn choose_next_map(&self, file_name: impl Into<String>) -> RpcResult<()> {
        self.call("ChooseNextMap", vec![json!(file_name.into())])
            .await
            .map(drop)
    }

    /// Skips to the next map.
    pub async fn next_map(&self) -> RpcResult<()> {
        self.call("NextMap", vec![]).await.map(drop)
    }

    /// Restarts the current map.
    pub async fn restart_map(&self) -> RpcResult<()> {
        self.call("RestartMap", vec![]).await.map(drop)
    }

    // ─── Mode settings ───────────────────────────────────────────────────────

    pub async fn set_mode_script_settings(&self, settings: &SettingsMap) -> RpcResult<()> {
        self.call(
            "SetModeScriptSettings",
            vec![Value::Object(settings.clone())],
        )
        .await
        .map(drop)
    }

    pub async fn save_match_settings(&self, path: impl Into<String>) -> RpcResult<()> {
        self.call("SaveMatchSettings", vec![json!(path.into())])
            .await
            .map(drop)
    }

    pub async fn get_mode_script_settings(&self) -> RpcResult<SettingsMap> {
        self.query("GetModeScriptSettings", vec![]).await
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub async fn get_version(&self) -> RpcResult<ServerVersion> {
        self.query("GetVersion", vec![]).await
    }

    pub async fn get_status(&self) -> RpcResult<ServerStatus> {
        self.query("GetStatus", vec![]).await
    }

    pub async fn get_maps_directory(&self) -> RpcResult<String> {
        self.query("GetMapsDirectory", vec![]).await
    }

    pub async fn get_player_info(&self, login: &str) -> RpcResult<PlayerStruct> {
        self.query("GetPlayerInfo", vec![json!(login), json!(1)])
            .await
    }

    pub async fn get_player_list(&self) -> RpcResult<Vec<PlayerStruct>> {
        self.query("GetPlayerList", vec![json!(LIST_PAGE_SIZE), json!(0)])
            .await
    }

    pub async fn get_current_map_info(&self) -> RpcResult<MapInfo> {
        let raw: MapStruct = self.query("GetCurrentMapInfo", vec![]).await?;
        Ok(raw.into())
    }

    pub async fn get_map_list(&self) -> RpcResult<Vec<MapInfo>> {
        let raw: Vec<MapStruct> = self
            .query("GetMapList", vec![json!(LIST_PAGE_SIZE), json!(0)])
            .await?;
        Ok(raw.into_iter().map(MapInfo::from).collect())
    }
}
