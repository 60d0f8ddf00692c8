//! Podium Controller
//!
//! A ready-to-run controller: the built-in jukebox and admin commands plus a
//! small greeter plugin that welcomes players and counts their visits.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the bridge configured in podium.toml
//! cargo run --package podium-controller -- --config demos/controller/podium.toml
//!
//! # Replay a short scripted session against an in-memory server
//! cargo run --package podium-controller -- --dry-run
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use podium::core::{LoopbackTransport, NotificationStream, names};
use podium::prelude::*;
use podium::runtime::ConfigLoader;
use podium::runtime::config::validate_config;

const DRY_RUN_ADMIN: &str = "dry-run-admin";

#[derive(Debug, Parser)]
#[command(name = "podium-controller", about = "Podium dedicated server controller")]
struct Args {
    /// Configuration file (searched in the working and user config directories otherwise).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `development` or `production`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Run a scripted session against an in-memory server instead of connecting.
    #[arg(long)]
    dry_run: bool,
}

// ============================================================================
// Greeter plugin
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GreeterConfig {
    /// Public welcome line; `{name}` is replaced by the player's nickname.
    welcome: String,
    /// Whether to tell returning players how often they have visited.
    count_visits: bool,
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            welcome: "Welcome {name}!".to_string(),
            count_visits: true,
        }
    }
}

#[derive(Default)]
struct Greeter {
    config: GreeterConfig,
    visits: Option<Arc<dyn Collection>>,
}

#[async_trait]
impl Plugin for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    async fn on_load(&mut self, ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
        self.config = ctx.get_config()?;
        if self.config.count_visits {
            self.visits = Some(ctx.storage().collection("greeter_visits")?);
        }
        ctx.registrar()
            .register_command("hello", Hello, "Say hello to the server");
        Ok(())
    }

    async fn on_player_connect(
        &mut self,
        ctl: &mut Controller,
        event: &PlayerConnect,
    ) -> anyhow::Result<()> {
        let name = ctl
            .state()
            .get_player(&event.login)
            .map_or(event.login.as_str(), |p| p.nickname.as_str())
            .to_string();
        ctl.remote()
            .chat_send(self.config.welcome.replace("{name}", &name))
            .await?;

        if let Some(visits) = &self.visits {
            let filter = document(json!({ "login": event.login }));
            let count = visits
                .find_one(&filter)
                .await?
                .and_then(|doc| doc.get("visits").and_then(Value::as_u64))
                .unwrap_or(0)
                + 1;
            visits
                .update_one(&filter, document(json!({ "visits": count })), true)
                .await?;
            if count > 1 {
                ctl.remote()
                    .chat_send_to(
                        event.login.as_str(),
                        format!("This is visit number {count}."),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

struct Hello;

#[async_trait]
impl CommandHandler for Hello {
    async fn handle(&self, ctl: &mut Controller, inv: &CommandInvocation) -> anyhow::Result<()> {
        let players = ctl.state().player_count();
        ctl.remote()
            .chat_send_to(
                inv.login.as_str(),
                format!("Hello {}! {players} player(s) online.", inv.login),
            )
            .await?;
        Ok(())
    }
}

// ============================================================================
// Dry run
// ============================================================================

/// An in-memory server with one map and a short scripted session that ends
/// with an administrator shutting the controller down.
async fn scripted_server() -> (Arc<LoopbackTransport>, NotificationStream) {
    let (transport, notifications) = LoopbackTransport::new();
    transport
        .respond("GetVersion", json!({ "Name": "Trackmania", "Version": "dry-run" }))
        .respond("GetPlayerList", json!([]))
        .respond(
            "GetCurrentMapInfo",
            json!({ "UId": "dry1", "Name": "Dry Run", "FileName": "DryRun.Map.Gbx" }),
        )
        .respond(
            "GetMapList",
            json!([{ "UId": "dry1", "Name": "Dry Run", "FileName": "DryRun.Map.Gbx" }]),
        )
        .respond("GetModeScriptSettings", json!({ "S_TimeLimit": 300 }))
        .respond("GetMapsDirectory", json!("Maps"))
        .respond("GameDataDirectory", json!("UserData"))
        .respond("GetStatus", json!({ "Code": 4, "Name": "Running - Play" }))
        .respond_with("GetPlayerInfo", |args| {
            let login = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(json!({ "Login": login, "NickName": format!("Player {login}") }))
        });

    let script = [
        (names::PLAYER_CONNECT, vec![json!("alice"), json!(false)]),
        (
            names::PLAYER_CHAT,
            vec![json!(1), json!("alice"), json!("/hello"), json!(true)],
        ),
        (names::PLAYER_CONNECT, vec![json!(DRY_RUN_ADMIN), json!(false)]),
        (
            names::PLAYER_CHAT,
            vec![json!(2), json!(DRY_RUN_ADMIN), json!("/admin shutdown"), json!(true)],
        ),
    ];
    for (name, args) in script {
        if !transport.notify(name, args).await {
            warn!(notification = name, "Dry-run notification dropped");
        }
    }
    (transport, notifications)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir().with_user_config_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    let mut config = loader.load()?;
    if args.dry_run {
        config.controller.admins.push(DRY_RUN_ADMIN.to_string());
    }
    validate_config(&config)?;

    let mut runtime = PodiumRuntime::from_config(config).with_plugin(Greeter::default());

    if args.dry_run {
        info!("Starting dry run against an in-memory server");
        let (transport, notifications) = scripted_server().await;
        runtime = runtime.with_transport(transport.clone(), notifications);
        runtime.run().await?;
        for call in transport.calls() {
            info!(method = %call.method, params = ?call.params, "Recorded call");
        }
        return Ok(());
    }

    runtime.run().await?;
    Ok(())
}
