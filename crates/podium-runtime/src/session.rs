//! Session negotiation and the blocking initial load.
//!
//! Both run before any plugin is loaded. A failure in either is fatal.

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use podium_core::PlayerInfo;
use podium_framework::{ModeConfiguration, PathHints, Remote, ServerState, ServerVersion};

use crate::config::ServerConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Negotiates the session: version probe, authentication, API version and
/// callback subscription (including mode-script callbacks).
pub async fn negotiate(remote: &Remote, server: &ServerConfig) -> RuntimeResult<ServerVersion> {
    let version = remote
        .get_version()
        .await
        .map_err(RuntimeError::session("GetVersion"))?;
    info!(
        name = %version.name,
        version = %version.version,
        build = %version.build,
        "Connected to dedicated server"
    );

    let authenticated = remote
        .call(
            "Authenticate",
            vec![json!(server.login), json!(server.password)],
        )
        .await
        .map_err(RuntimeError::session("Authenticate"))?;
    if authenticated != Value::Bool(true) {
        return Err(RuntimeError::AuthenticationRejected {
            login: server.login.clone(),
        });
    }
    debug!(login = %server.login, "Authenticated");

    remote
        .call("SetApiVersion", vec![json!(server.api_version)])
        .await
        .map_err(RuntimeError::session("SetApiVersion"))?;
    remote
        .call("EnableCallbacks", vec![json!(true)])
        .await
        .map_err(RuntimeError::session("EnableCallbacks"))?;
    remote
        .call(
            "TriggerModeScriptEventArray",
            vec![json!("XmlRpc.EnableCallbacks"), json!(["true"])],
        )
        .await
        .map_err(RuntimeError::session("TriggerModeScriptEventArray"))?;

    info!(api_version = %server.api_version, "Session negotiated");
    Ok(version)
}

/// Loads the roster, maps, mode settings, paths and status.
pub async fn load_initial_state(remote: &Remote, version: ServerVersion) -> RuntimeResult<ServerState> {
    let mut state = ServerState::new();
    state.set_version(version);

    let players = remote
        .get_player_list()
        .await
        .map_err(RuntimeError::initial_load("GetPlayerList"))?;
    state.set_players(players.into_iter().map(PlayerInfo::from));

    let current = remote
        .get_current_map_info()
        .await
        .map_err(RuntimeError::initial_load("GetCurrentMapInfo"))?;
    state.set_current_map(current);

    let maps = remote
        .get_map_list()
        .await
        .map_err(RuntimeError::initial_load("GetMapList"))?;
    state.set_maps(maps);

    let settings = remote
        .get_mode_script_settings()
        .await
        .map_err(RuntimeError::initial_load("GetModeScriptSettings"))?;
    state.set_mode(ModeConfiguration::new(settings));

    let maps_directory = remote
        .get_maps_directory()
        .await
        .map_err(RuntimeError::initial_load("GetMapsDirectory"))?;
    let user_data_directory = match remote.query::<String>("GameDataDirectory", vec![]).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "Game data directory unavailable");
            String::new()
        }
    };
    state.set_paths(PathHints {
        maps_directory,
        user_data_directory,
    });

    let status = remote
        .get_status()
        .await
        .map_err(RuntimeError::initial_load("GetStatus"))?;
    state.set_status(status);

    info!(
        players = state.player_count(),
        maps = state.maps().len(),
        current_map = state.current_map().map(|m| m.name.as_str()).unwrap_or("-"),
        settings = state.mode().temporary().len(),
        "Initial state loaded"
    );
    Ok(state)
}
