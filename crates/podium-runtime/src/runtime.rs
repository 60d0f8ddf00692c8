//! Runtime orchestration.
//!
//! ```text
//! load config ─▶ init logging ─▶ connect ─▶ negotiate session ─▶ initial load
//!     ─▶ load plugins ─▶ dispatch until Ctrl+C / shutdown / stream end ─▶ unload
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use podium_runtime::PodiumRuntime;
//!
//! let runtime = PodiumRuntime::builder()
//!     .config_file("podium.toml")
//!     .build()?
//!     .with_plugin(MyPlugin::default());
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use podium_core::{BoxedTransport, JsonFileStorage, MemoryStorage, NotificationStream, Storage};
use podium_framework::builtin::JukeboxPlugin;
use podium_framework::{BoxedPlugin, Controller, Dispatcher, Plugin, Remote};

use crate::admin::AdminPlugin;
use crate::config::{
    ConfigLoader, ConfigResult, PodiumConfig, StorageBackend, StorageConfig, validate_config,
};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::session;

/// The Podium controller runtime.
///
/// Owns the configuration and the user plugins until [`run`](Self::run)
/// builds the dispatcher. The built-in jukebox and admin plugins are
/// registered ahead of user plugins unless disabled in the config.
pub struct PodiumRuntime {
    config: PodiumConfig,
    plugins: Vec<BoxedPlugin>,
    /// Pre-built transport; when absent the WebSocket client is used.
    transport: Option<(BoxedTransport, NotificationStream)>,
}

impl PodiumRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging from it.
    pub fn from_config(config: PodiumConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            server = %config.server.url,
            admins = config.controller.admins.len(),
            "Podium runtime created"
        );

        Self {
            config,
            plugins: Vec::new(),
            transport: None,
        }
    }

    pub fn config(&self) -> &PodiumConfig {
        &self.config
    }

    /// Registers a user plugin. Registration order is dispatch order.
    pub fn register_plugin<P: Plugin + 'static>(&mut self, plugin: P) {
        self.plugins.push(Box::new(plugin));
    }

    /// Registers a user plugin (builder pattern).
    pub fn with_plugin<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.register_plugin(plugin);
        self
    }

    /// Uses an already connected transport instead of the WebSocket client.
    pub fn with_transport(mut self, transport: BoxedTransport, notifications: NotificationStream) -> Self {
        self.transport = Some((transport, notifications));
        self
    }

    /// Runs until Ctrl+C (or SIGTERM), a requested shutdown, or the end of
    /// the notification stream.
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` resolves, a requested shutdown, or the end of
    /// the notification stream.
    pub async fn run_until<F>(mut self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        validate_config(&self.config)?;

        let (transport, mut notifications) = self.connect().await?;
        let remote = Remote::new(transport.clone());

        let version = session::negotiate(&remote, &self.config.server).await?;
        let state = session::load_initial_state(&remote, version).await?;
        let storage = open_storage(&self.config.storage).await?;

        let controller_config = &self.config.controller;
        let controller = Controller::new(transport.clone(), state)
            .with_command_keyword(controller_config.command_keyword.as_str())
            .with_admins(controller_config.admins.iter().cloned())
            .with_match_settings_file(controller_config.match_settings_file.as_str())
            .with_storage(storage);

        let mut dispatcher =
            Dispatcher::new(controller).with_plugin_configs(self.config.plugins.clone());
        if controller_config.jukebox {
            dispatcher.register(JukeboxPlugin);
        }
        if controller_config.admin_commands {
            dispatcher.register(AdminPlugin::new(controller_config.extend_seconds));
        }
        for plugin in self.plugins.drain(..) {
            dispatcher.register_boxed(plugin);
        }
        dispatcher.start().await;

        info!("Podium is now running. Press Ctrl+C to stop.");
        dispatcher.run(&mut notifications, shutdown).await;

        transport.close().await;
        info!("Podium stopped");
        Ok(())
    }

    async fn connect(&mut self) -> RuntimeResult<(BoxedTransport, NotificationStream)> {
        if let Some(prepared) = self.transport.take() {
            return Ok(prepared);
        }
        self.connect_ws().await
    }

    #[cfg(feature = "ws-client")]
    async fn connect_ws(&self) -> RuntimeResult<(BoxedTransport, NotificationStream)> {
        use podium_transport::{WsClientConfig, WsTransport};

        let server = &self.config.server;
        let config = WsClientConfig::new(server.url.as_str()).with_request_timeout(server.timeout());
        let (transport, notifications) = WsTransport::connect(config).await?;
        let transport: BoxedTransport = transport;
        Ok((transport, notifications))
    }

    #[cfg(not(feature = "ws-client"))]
    async fn connect_ws(&self) -> RuntimeResult<(BoxedTransport, NotificationStream)> {
        Err(RuntimeError::NoTransport(
            "the `ws-client` feature is disabled and no transport was provided".to_string(),
        ))
    }
}

async fn open_storage(config: &StorageConfig) -> RuntimeResult<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::File => Arc::new(JsonFileStorage::open(config.path.clone()).await?),
    };
    info!(backend = storage.backend_name(), "Storage ready");
    Ok(storage)
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => on_ctrl_c(result).await,
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                on_ctrl_c(signal::ctrl_c().await).await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        on_ctrl_c(signal::ctrl_c().await).await;
    }
}

async fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C; running until the stream ends");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`PodiumRuntime`] with custom configuration loading.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir().with_user_config_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: PodiumConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<PodiumRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(PodiumRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use podium_core::event::PlayerConnect;
    use podium_core::{LoopbackTransport, names};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use podium_framework::PluginLoadContext;

    #[derive(Default, Deserialize)]
    struct StopperConfig {
        #[serde(default)]
        tag: String,
    }

    /// Records connects with its configured tag, then stops the controller.
    struct Stopper {
        seen: Arc<Mutex<Vec<String>>>,
        tag: String,
    }

    #[async_trait]
    impl Plugin for Stopper {
        fn name(&self) -> &str {
            "stopper"
        }

        async fn on_load(&mut self, ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
            let config: StopperConfig = ctx.get_config()?;
            self.tag = config.tag;
            Ok(())
        }

        async fn on_player_connect(
            &mut self,
            ctl: &mut Controller,
            event: &PlayerConnect,
        ) -> anyhow::Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", self.tag, event.login, ctl.state().player_count()));
            ctl.request_shutdown();
            Ok(())
        }
    }

    fn scripted_server() -> (Arc<LoopbackTransport>, NotificationStream) {
        let (transport, notifications) = LoopbackTransport::new();
        transport
            .respond("GetVersion", json!({ "Name": "Trackmania" }))
            .respond("GetPlayerList", json!([]))
            .respond(
                "GetCurrentMapInfo",
                json!({ "UId": "m1", "Name": "Map One", "FileName": "m1.Map.Gbx" }),
            )
            .respond("GetMapList", json!([]))
            .respond("GetModeScriptSettings", json!({ "S_TimeLimit": 300 }))
            .respond("GetMapsDirectory", json!("/maps"))
            .respond("GameDataDirectory", json!("/data"))
            .respond("GetStatus", json!({ "Code": 4, "Name": "Running - Play" }));
        (transport, notifications)
    }

    #[tokio::test]
    async fn test_run_with_loopback_transport() {
        let (transport, notifications) = scripted_server();
        assert!(
            transport
                .notify(names::PLAYER_CONNECT, vec![json!("alice"), json!(false)])
                .await
        );

        let mut config = PodiumConfig::default();
        config
            .plugins
            .insert("stopper".to_string(), json!({ "tag": "t1" }));
        let seen = Arc::new(Mutex::new(Vec::new()));

        PodiumRuntime::from_config(config)
            .with_transport(transport.clone(), notifications)
            .with_plugin(Stopper {
                seen: seen.clone(),
                tag: String::new(),
            })
            .run_until(std::future::pending())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["t1:alice:1"]);
        assert_eq!(transport.calls_to("EnableCallbacks"), vec![vec![json!(true)]]);
    }

    #[tokio::test]
    async fn test_run_fails_on_rejected_session() {
        let (transport, notifications) = scripted_server();
        transport.respond("Authenticate", json!(false));

        let result = PodiumRuntime::from_config(PodiumConfig::default())
            .with_transport(transport.clone(), notifications)
            .run_until(std::future::pending())
            .await;

        assert!(matches!(
            result,
            Err(RuntimeError::AuthenticationRejected { .. })
        ));
        assert!(transport.calls_to("GetPlayerList").is_empty());
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let (transport, notifications) = scripted_server();
        let mut config = PodiumConfig::default();
        config.server.url = "tcp://nowhere".to_string();

        let result = PodiumRuntime::from_config(config)
            .with_transport(transport.clone(), notifications)
            .run_until(std::future::pending())
            .await;

        assert!(matches!(result, Err(RuntimeError::Config(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: dir.path().join("store"),
        };

        let storage = open_storage(&config).await.unwrap();
        let records = storage.collection("records").unwrap();
        records
            .insert_one(podium_core::document(json!({ "login": "alice" })))
            .await
            .unwrap();
        assert_eq!(records.count(&Default::default()).await.unwrap(), 1);
    }
}
