//! The plugin hook contract.
//!
//! A plugin implements [`Plugin`] and overrides only the hooks it cares
//! about; every hook has a no-op default, so a missing hook is simply never
//! noticed. The dispatcher calls [`Plugin::on_event`], whose default routes
//! each [`ServerEvent`] variant to its hook.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     async fn on_player_connect(
//!         &mut self,
//!         ctl: &mut Controller,
//!         event: &PlayerConnect,
//!     ) -> anyhow::Result<()> {
//!         ctl.remote().chat_send(format!("Welcome {}!", event.login)).await?;
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use podium_core::Storage;
use podium_core::event::*;

use crate::command::Registrar;
use crate::controller::Controller;

/// Tracks the load state of a plugin registered with the dispatcher.
///
/// ```text
/// register()      ──► Registered
/// load_plugins()  ──► Active    (on_load succeeded)
///                 ──► Failed    (on_load failed; plugin skipped)
/// shutdown()      ──► Registered (Active → Registered after on_unload)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginLoadState {
    /// Registered but not yet loaded.
    Registered,
    /// Loaded and receiving events.
    Active,
    /// `on_load` failed; the plugin never receives events.
    Failed,
}

/// Context passed to a plugin's `on_load` hook.
///
/// Provides the plugin's configuration section (an empty JSON object when
/// absent), a command registrar and the storage handle.
pub struct PluginLoadContext<'a> {
    config: &'a Value,
    storage: Arc<dyn Storage>,
    registrar: Registrar<'a>,
}

impl<'a> PluginLoadContext<'a> {
    pub(crate) fn new(config: &'a Value, storage: Arc<dyn Storage>, registrar: Registrar<'a>) -> Self {
        Self {
            config,
            storage,
            registrar,
        }
    }

    /// Deserialise the plugin config section into `T`.
    ///
    /// Returns `Err` if the config is missing required fields or has the wrong
    /// shape; use `#[serde(default)]` on the struct to make all fields optional.
    pub fn get_config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.config)
    }

    /// Raw config section.
    pub fn raw_config(&self) -> &Value {
        self.config
    }

    /// Registers chat commands owned by this plugin.
    pub fn registrar(&mut self) -> &mut Registrar<'a> {
        &mut self.registrar
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }
}

/// A feature module participating in dispatch.
///
/// Hooks run sequentially in registration order, each to completion before
/// the next starts. A returned error or a panic is logged and does not stop
/// the remaining plugins.
#[async_trait]
pub trait Plugin: Send {
    /// Unique plugin name; also the key of its config section.
    fn name(&self) -> &str;

    async fn on_load(&mut self, _ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_unload(&mut self, _ctl: &mut Controller) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes an event to its hook.
    async fn on_event(&mut self, ctl: &mut Controller, event: &ServerEvent) -> anyhow::Result<()> {
        match event {
            ServerEvent::PlayerConnect(e) => self.on_player_connect(ctl, e).await,
            ServerEvent::PlayerDisconnect(e) => self.on_player_disconnect(ctl, e).await,
            ServerEvent::PlayerChat(e) => self.on_player_chat(ctl, e).await,
            ServerEvent::MapBegin(e) => self.on_map_begin(ctl, e).await,
            ServerEvent::MapEnd(e) => self.on_map_end(ctl, e).await,
            ServerEvent::MatchBegin(e) => self.on_match_begin(ctl, e).await,
            ServerEvent::MatchEnd(e) => self.on_match_end(ctl, e).await,
            ServerEvent::BillUpdate(e) => self.on_bill_update(ctl, e).await,
            ServerEvent::MapListChange(e) => self.on_map_list_change(ctl, e).await,
            ServerEvent::ModeScript(e) => self.on_mode_script_callback(ctl, e).await,
            ServerEvent::AllianceChange(e) => self.on_alliance_change(ctl, e).await,
            ServerEvent::PlayerInfoChange(e) => self.on_player_info_change(ctl, e).await,
            ServerEvent::ManialinkAnswer(e) => self.on_manialink_answer(ctl, e).await,
            ServerEvent::StatusChange(e) => self.on_status_change(ctl, e).await,
            ServerEvent::TunnelData(e) => self.on_tunnel_data(ctl, e).await,
            ServerEvent::VoteUpdate(e) => self.on_vote_update(ctl, e).await,
            ServerEvent::Waypoint(e) => self.on_waypoint(ctl, e).await,
            ServerEvent::Checkpoint(e) => self.on_checkpoint(ctl, e).await,
            ServerEvent::Finish(e) => self.on_finish(ctl, e).await,
            ServerEvent::Incoherence(e) => self.on_incoherence(ctl, e).await,
        }
    }

    // ─── Players ─────────────────────────────────────────────────────────────

    async fn on_player_connect(&mut self, _ctl: &mut Controller, _event: &PlayerConnect) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_player_disconnect(&mut self, _ctl: &mut Controller, _event: &PlayerDisconnect) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fires for every chat line, after command dispatch.
    async fn on_player_chat(&mut self, _ctl: &mut Controller, _event: &PlayerChat) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_alliance_change(&mut self, _ctl: &mut Controller, _event: &AllianceChange) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_player_info_change(&mut self, _ctl: &mut Controller, _event: &PlayerInfoChange) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_manialink_answer(&mut self, _ctl: &mut Controller, _event: &ManialinkAnswer) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_tunnel_data(&mut self, _ctl: &mut Controller, _event: &TunnelData) -> anyhow::Result<()> {
        Ok(())
    }

    // ─── Maps and matches ────────────────────────────────────────────────────

    async fn on_map_begin(&mut self, _ctl: &mut Controller, _event: &MapBegin) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_map_end(&mut self, _ctl: &mut Controller, _event: &MapEnd) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_match_begin(&mut self, _ctl: &mut Controller, _event: &MatchBegin) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_match_end(&mut self, _ctl: &mut Controller, _event: &MatchEnd) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_map_list_change(&mut self, _ctl: &mut Controller, _event: &MapListChange) -> anyhow::Result<()> {
        Ok(())
    }

    // ─── Server ──────────────────────────────────────────────────────────────

    async fn on_bill_update(&mut self, _ctl: &mut Controller, _event: &BillUpdate) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_status_change(&mut self, _ctl: &mut Controller, _event: &StatusChange) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_vote_update(&mut self, _ctl: &mut Controller, _event: &VoteUpdate) -> anyhow::Result<()> {
        Ok(())
    }

    /// Mode-script callbacks without a dedicated hook.
    async fn on_mode_script_callback(&mut self, _ctl: &mut Controller, _event: &ModeScriptEvent) -> anyhow::Result<()> {
        Ok(())
    }

    // ─── Race ────────────────────────────────────────────────────────────────

    async fn on_waypoint(&mut self, _ctl: &mut Controller, _event: &Waypoint) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_checkpoint(&mut self, _ctl: &mut Controller, _event: &Checkpoint) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_finish(&mut self, _ctl: &mut Controller, _event: &Finish) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_incoherence(&mut self, _ctl: &mut Controller, _event: &Incoherence) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Boxed plugin as stored by the dispatcher.
pub type BoxedPlugin = Box<dyn Plugin>;
