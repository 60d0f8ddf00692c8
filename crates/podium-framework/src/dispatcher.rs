//! Notification dispatch.
//!
//! [`Dispatcher`] owns the [`Controller`] and the registered plugins and runs
//! the control loop. Each notification is handled to completion before the
//! next one is taken:
//!
//! 1. translate the notification (unknown kinds stop here, malformed ones are
//!    dropped with a warning);
//! 2. apply the state mutation the event implies;
//! 3. for command chat lines, run the matching command handler;
//! 4. call the event's hook on every active plugin, in registration order.
//!
//! A hook that returns an error or panics is logged and the remaining
//! plugins still run.
//!
//! ```text
//!            start()             shutdown() / request_shutdown()
//! Idle ─────────────────▶ Ready ─────────────────────────────────▶ Shutdown
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{Instrument, debug, debug_span, error, info, warn};

use podium_core::event::{PlayerChat, ServerEvent, translate};
use podium_core::{Notification, NotificationStream, PlayerInfo};

use crate::command::{CommandInvocation, parse_command_line};
use crate::controller::Controller;
use crate::plugin::{BoxedPlugin, Plugin, PluginLoadContext, PluginLoadState};
use crate::state::ServerStatus;

/// Private reply sent when a non-administrator uses the privileged keyword.
pub const NOT_AUTHORIZED_MESSAGE: &str = "You are not authorized to use admin commands.";

/// Lifecycle of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Plugins may be registered; notifications are dropped.
    Idle,
    /// Plugins are loaded and notifications are dispatched.
    Ready,
    /// Terminal; plugins have been unloaded.
    Shutdown,
}

struct PluginEntry {
    name: String,
    plugin: BoxedPlugin,
    state: PluginLoadState,
}

/// The control loop.
pub struct Dispatcher {
    controller: Controller,
    plugins: Vec<PluginEntry>,
    /// Per-plugin config sections, keyed by plugin name.
    plugin_configs: HashMap<String, Value>,
    state: DispatcherState,
}

impl Dispatcher {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            plugins: Vec::new(),
            plugin_configs: HashMap::new(),
            state: DispatcherState::Idle,
        }
    }

    /// Sets the per-plugin config sections (builder pattern).
    pub fn with_plugin_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.plugin_configs = configs;
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == DispatcherState::Ready
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    // ─── Plugin registration ─────────────────────────────────────────────────

    /// Registers a plugin. Registration order is dispatch order.
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) {
        self.register_boxed(Box::new(plugin));
    }

    /// Registers an already boxed plugin.
    ///
    /// Only possible while idle; plugin names must be unique.
    pub fn register_boxed(&mut self, plugin: BoxedPlugin) {
        let name = plugin.name().to_string();
        if self.state != DispatcherState::Idle {
            warn!(plugin = %name, state = ?self.state, "Plugins can only be registered before start; ignored");
            return;
        }
        if self.plugins.iter().any(|e| e.name == name) {
            warn!(plugin = %name, "A plugin with this name is already registered; ignored");
            return;
        }
        self.plugins.push(PluginEntry {
            name: name.clone(),
            plugin,
            state: PluginLoadState::Registered,
        });
        info!(plugin = %name, "Plugin registered");
    }

    /// Returns the number of registered plugins (in any state).
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Returns the load state of the named plugin, or `None` if not found.
    pub fn plugin_state(&self, name: &str) -> Option<PluginLoadState> {
        self.plugins
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.state)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Loads every registered plugin in registration order and enters
    /// [`DispatcherState::Ready`].
    ///
    /// A plugin whose `on_load` fails is marked [`PluginLoadState::Failed`],
    /// its commands are dropped and it never receives events.
    pub async fn start(&mut self) {
        if self.state != DispatcherState::Idle {
            warn!(state = ?self.state, "Dispatcher already started");
            return;
        }

        let empty = Value::Object(Map::new());
        for entry in self.plugins.iter_mut() {
            let config = self.plugin_configs.get(&entry.name).unwrap_or(&empty);
            let storage = self.controller.storage().clone();
            let mut ctx =
                PluginLoadContext::new(config, storage, self.controller.registrar(&entry.name));

            let outcome = AssertUnwindSafe(entry.plugin.on_load(&mut ctx))
                .catch_unwind()
                .await;
            drop(ctx);

            if report(&entry.name, "on_load", outcome) {
                entry.state = PluginLoadState::Active;
                info!(plugin = %entry.name, "Plugin loaded and active");
            } else {
                entry.state = PluginLoadState::Failed;
                self.controller.commands_mut().remove_owned_by(&entry.name);
                error!(plugin = %entry.name, "Plugin failed to load and will not receive events");
            }
        }

        self.state = DispatcherState::Ready;
        info!(plugins = self.plugins.len(), "Dispatcher ready");
    }

    /// Unloads active plugins in reverse registration order and enters
    /// [`DispatcherState::Shutdown`].
    pub async fn shutdown(&mut self) {
        if self.state == DispatcherState::Shutdown {
            return;
        }
        for entry in self
            .plugins
            .iter_mut()
            .rev()
            .filter(|e| e.state == PluginLoadState::Active)
        {
            let outcome = AssertUnwindSafe(entry.plugin.on_unload(&mut self.controller))
                .catch_unwind()
                .await;
            report(&entry.name, "on_unload", outcome);
            entry.state = PluginLoadState::Registered;
            info!(plugin = %entry.name, "Plugin unloaded");
        }
        self.state = DispatcherState::Shutdown;
        info!("Dispatcher shut down");
    }

    /// Dispatches notifications until `shutdown` resolves, the stream closes
    /// or a shutdown is requested, then unloads the plugins.
    ///
    /// A notification being handled is never interrupted by `shutdown`.
    pub async fn run<F>(&mut self, notifications: &mut NotificationStream, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        while self.is_ready() {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                next = notifications.recv() => match next {
                    Some(notification) => self.handle(notification).await,
                    None => {
                        info!("Notification stream closed");
                        break;
                    }
                },
            }
        }
        self.shutdown().await;
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Handles one notification to completion.
    pub async fn handle(&mut self, notification: Notification) {
        if self.state != DispatcherState::Ready {
            warn!(
                notification = %notification.name,
                state = ?self.state,
                "Dispatcher not ready; notification dropped"
            );
            return;
        }

        let span = debug_span!("dispatch", notification = %notification.name);
        self.process(notification).instrument(span).await;

        if self.controller.shutdown_requested() {
            self.shutdown().await;
        }
    }

    async fn process(&mut self, notification: Notification) {
        let event = match translate(&notification.name, &notification.args) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Unhandled notification ignored");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Malformed notification dropped");
                return;
            }
        };

        self.apply_state(&event).await;

        if let ServerEvent::PlayerChat(chat) = &event
            && chat.is_command
        {
            self.dispatch_command(chat).await;
        }

        self.broadcast(&event).await;
    }

    /// Applies the state mutation implied by `event`, before any hook runs.
    async fn apply_state(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::PlayerConnect(e) => {
                let info = match self.controller.remote().get_player_info(&e.login).await {
                    Ok(raw) => PlayerInfo::from(raw).spectator(e.is_spectator),
                    Err(err) => {
                        debug!(login = %e.login, error = %err, "Player info unavailable; using login as name");
                        PlayerInfo::from_login(e.login.as_str()).spectator(e.is_spectator)
                    }
                };
                if let Err(err) = self.controller.state_mut().add_player(info) {
                    warn!(error = %err, "Connect for a player already on the roster");
                }
            }
            ServerEvent::PlayerDisconnect(e) => {
                if self.controller.state_mut().remove_player(&e.login).is_none() {
                    warn!(login = %e.login, "Disconnect for a player not on the roster");
                }
            }
            ServerEvent::MapBegin(e) => {
                self.controller.state_mut().set_current_map(e.map.clone());
                match self.controller.settings().begin_map().await {
                    Ok(true) => debug!("Default settings restored for the new map"),
                    Ok(false) => {}
                    Err(err) => warn!(error = %err, "Failed to restore default settings"),
                }
            }
            ServerEvent::PlayerInfoChange(e) => {
                if !self.controller.state_mut().update_player(e.player.clone()) {
                    debug!(login = %e.player.login, "Info change for a player not on the roster");
                }
            }
            ServerEvent::StatusChange(e) => {
                self.controller.state_mut().set_status(ServerStatus {
                    code: e.code,
                    name: e.name.clone(),
                });
            }
            ServerEvent::MapListChange(e) if e.is_list_modified => {
                match self.controller.remote().get_map_list().await {
                    Ok(maps) => {
                        debug!(count = maps.len(), "Map list refreshed");
                        self.controller.state_mut().set_maps(maps);
                    }
                    Err(err) => warn!(error = %err, "Failed to refresh the map list"),
                }
            }
            _ => {}
        }
    }

    /// Resolves and runs the command typed in `chat`.
    async fn dispatch_command(&mut self, chat: &PlayerChat) {
        let keyword = self.controller.commands().keyword();
        let Some(line) = parse_command_line(&chat.text, keyword) else {
            return;
        };

        if line.privileged && !self.controller.is_admin(&chat.login) {
            warn!(login = %chat.login, command = %line.name, "Privileged command refused");
            if let Err(e) = self
                .controller
                .remote()
                .chat_send_to(chat.login.as_str(), NOT_AUTHORIZED_MESSAGE)
                .await
            {
                warn!(error = %e, "Failed to send not-authorized notice");
            }
            return;
        }

        let commands = self.controller.commands();
        let found = if line.privileged {
            commands.find_privileged(&line.name)
        } else {
            commands.find(&line.name)
        };
        let Some((handler, owner)) = found.map(|d| (d.handler.clone(), d.owner.clone())) else {
            debug!(command = %line.name, privileged = line.privileged, "No such command");
            return;
        };

        let invocation = CommandInvocation {
            login: chat.login.clone(),
            name: line.name,
            args: line.args,
            privileged: line.privileged,
        };
        let span = debug_span!("command", command = %invocation.name, plugin = %owner);
        let outcome = AssertUnwindSafe(handler.handle(&mut self.controller, &invocation))
            .catch_unwind()
            .instrument(span)
            .await;
        report(&owner, "command", outcome);
    }

    /// Calls the hook for `event` on every active plugin, in order.
    async fn broadcast(&mut self, event: &ServerEvent) {
        let event_name = event.event_name();
        for entry in self
            .plugins
            .iter_mut()
            .filter(|e| e.state == PluginLoadState::Active)
        {
            let span = debug_span!("hook", event = %event_name, plugin = %entry.name);
            let outcome = AssertUnwindSafe(entry.plugin.on_event(&mut self.controller, event))
                .catch_unwind()
                .instrument(span)
                .await;
            report(&entry.name, event_name, outcome);
        }
    }
}

/// Logs a failed hook. Returns `true` on success.
fn report(
    plugin: &str,
    hook: &str,
    outcome: Result<anyhow::Result<()>, Box<dyn Any + Send>>,
) -> bool {
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(plugin, hook, error = %format!("{e:#}"), "Plugin hook failed");
            false
        }
        Err(panic) => {
            error!(plugin, hook, panic = %panic_message(panic.as_ref()), "Plugin hook panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use podium_core::event::*;
    use podium_core::{LoopbackTransport, MapInfo};
    use serde_json::json;

    use super::*;
    use crate::builtin::JukeboxPlugin;
    use crate::command::CommandHandler;
    use crate::settings::{ModeConfiguration, TIME_LIMIT_KEY};
    use crate::state::ServerState;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records every hook it sees as `"<plugin>:<event>:<detail>"`.
    struct Recorder {
        name: String,
        log: Log,
        fail_with: Option<&'static str>,
    }

    impl Recorder {
        fn new(name: &str, log: &Log) -> Self {
            Self {
                name: name.to_string(),
                log: log.clone(),
                fail_with: None,
            }
        }

        fn failing(name: &str, log: &Log, how: &'static str) -> Self {
            Self {
                fail_with: Some(how),
                ..Self::new(name, log)
            }
        }

        fn push(&self, entry: String) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("{}:{entry}", self.name));
            match self.fail_with {
                Some("panic") => panic!("{} exploded", self.name),
                Some(message) => anyhow::bail!("{message}"),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn on_unload(&mut self, _ctl: &mut Controller) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("{}:unload", self.name));
            Ok(())
        }

        async fn on_player_connect(
            &mut self,
            ctl: &mut Controller,
            event: &PlayerConnect,
        ) -> anyhow::Result<()> {
            // The roster is already updated when the hook runs.
            assert!(ctl.state().is_online(&event.login));
            self.push(format!("connect:{}:{}", event.login, event.is_spectator))
        }

        async fn on_player_chat(
            &mut self,
            _ctl: &mut Controller,
            event: &PlayerChat,
        ) -> anyhow::Result<()> {
            self.push(format!("chat:{}", event.text))
        }
    }

    struct RecordingCommand(Log);

    #[async_trait]
    impl CommandHandler for RecordingCommand {
        async fn handle(
            &self,
            _ctl: &mut Controller,
            inv: &CommandInvocation,
        ) -> anyhow::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push(format!("command:{}:{}", inv.name, inv.args.join(",")));
            Ok(())
        }
    }

    /// Registers one regular and one privileged recording command.
    struct CommandPlugin(Log);

    #[async_trait]
    impl Plugin for CommandPlugin {
        fn name(&self) -> &str {
            "commands"
        }

        async fn on_load(&mut self, ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
            let log = self.0.clone();
            ctx.registrar()
                .register_command("hello", RecordingCommand(log.clone()), "Say hello");
            ctx.registrar().register_privileged_command(
                "restart",
                RecordingCommand(log),
                "Restart the map",
            );
            Ok(())
        }
    }

    struct BrokenLoad;

    #[async_trait]
    impl Plugin for BrokenLoad {
        fn name(&self) -> &str {
            "broken"
        }

        async fn on_load(&mut self, ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
            ctx.registrar()
                .register_command("broken", RecordingCommand(Log::default()), "Never kept");
            anyhow::bail!("missing configuration")
        }

        async fn on_player_connect(
            &mut self,
            _ctl: &mut Controller,
            _event: &PlayerConnect,
        ) -> anyhow::Result<()> {
            panic!("a failed plugin must not receive events");
        }
    }

    fn settings(value: serde_json::Value) -> crate::settings::SettingsMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn map_struct(uid: &str) -> serde_json::Value {
        json!({ "UId": uid, "Name": format!("Map {uid}"), "FileName": format!("{uid}.Map.Gbx") })
    }

    fn setup(state: ServerState) -> (Dispatcher, Arc<LoopbackTransport>) {
        let (transport, _rx) = LoopbackTransport::new();
        let controller = Controller::new(transport.clone(), state).with_admins(["root"]);
        (Dispatcher::new(controller), transport)
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_player_connect_updates_roster_then_hooks() {
        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(Recorder::new("first", &log));
        dispatcher.register(Recorder::new("second", &log));
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("alice"), json!(false)],
            ))
            .await;

        let state = dispatcher.controller().state();
        assert_eq!(state.player_count(), 1);
        assert_eq!(state.get_player("alice").unwrap().login, "alice");
        assert_eq!(
            entries(&log),
            vec!["first:connect:alice:false", "second:connect:alice:false"]
        );
    }

    #[tokio::test]
    async fn test_connect_uses_remote_nickname() {
        let (mut dispatcher, transport) = setup(ServerState::new());
        transport.respond(
            "GetPlayerInfo",
            json!({ "Login": "bob", "NickName": "$0f0Bob", "PlayerId": 12 }),
        );
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("bob"), json!(true)],
            ))
            .await;
        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("bob"), json!(true)],
            ))
            .await;

        let state = dispatcher.controller().state();
        assert_eq!(state.player_count(), 1);
        let bob = state.get_player("bob").unwrap();
        assert_eq!(bob.nickname, "$0f0Bob");
        assert!(bob.is_spectator);
    }

    #[tokio::test]
    async fn test_privileged_command_from_non_admin() {
        let log = Log::default();
        let (mut dispatcher, transport) = setup(ServerState::new());
        dispatcher.register(CommandPlugin(log.clone()));
        dispatcher.register(Recorder::new("a", &log));
        dispatcher.register(Recorder::new("b", &log));
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CHAT,
                vec![json!(5), json!("mallory"), json!("/admin restart"), json!(true)],
            ))
            .await;

        assert_eq!(
            entries(&log),
            vec!["a:chat:/admin restart", "b:chat:/admin restart"]
        );
        assert_eq!(
            transport.calls_to("ChatSendServerMessageToLogin"),
            vec![vec![json!(NOT_AUTHORIZED_MESSAGE), json!("mallory")]]
        );
    }

    #[tokio::test]
    async fn test_commands_run_before_chat_hook() {
        let log = Log::default();
        let (mut dispatcher, transport) = setup(ServerState::new());
        dispatcher.register(Recorder::new("a", &log));
        dispatcher.register(CommandPlugin(log.clone()));
        dispatcher.start().await;

        for (login, text) in [("root", "/admin restart now"), ("alice", "/hello"), ("alice", "/nope")] {
            dispatcher
                .handle(Notification::new(
                    names::PLAYER_CHAT,
                    vec![json!(1), json!(login), json!(text), json!(true)],
                ))
                .await;
        }
        // Not flagged as a command by the server: no handler runs.
        dispatcher
            .handle(Notification::new(
                names::PLAYER_CHAT,
                vec![json!(1), json!("alice"), json!("/hello"), json!(false)],
            ))
            .await;

        assert_eq!(
            entries(&log),
            vec![
                "command:restart:now",
                "a:chat:/admin restart now",
                "command:hello:",
                "a:chat:/hello",
                "a:chat:/nope",
                "a:chat:/hello",
            ]
        );
        assert!(transport.calls_to("ChatSendServerMessageToLogin").is_empty());
    }

    #[tokio::test]
    async fn test_extension_does_not_carry_into_next_map() {
        let mut state = ServerState::new();
        state.set_mode(ModeConfiguration::new(settings(
            json!({ "S_TimeLimit": 300, "S_WarmUpNb": 0 }),
        )));
        let (mut dispatcher, transport) = setup(state);
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(names::BEGIN_MAP, vec![map_struct("m1")]))
            .await;
        assert!(transport.calls_to("SetModeScriptSettings").is_empty());

        let extended = dispatcher
            .controller_mut()
            .settings()
            .extend_time(60)
            .await
            .unwrap();
        assert_eq!(extended, 360);

        dispatcher
            .handle(Notification::new(names::BEGIN_MAP, vec![map_struct("m2")]))
            .await;

        let ctl = dispatcher.controller();
        assert_eq!(ctl.state().current_map().unwrap().uid, "m2");
        assert_eq!(ctl.state().mode().get(TIME_LIMIT_KEY), Some(&json!(300)));
        assert_eq!(ctl.state().mode().defaults()[TIME_LIMIT_KEY], json!(300));
        let pushed = transport.calls_to("SetModeScriptSettings");
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[1][0][TIME_LIMIT_KEY], json!(300));
    }

    #[tokio::test]
    async fn test_kept_extension_carries_into_next_map() {
        let mut state = ServerState::new();
        state.set_mode(ModeConfiguration::new(settings(json!({ "S_TimeLimit": 300 }))));
        let (mut dispatcher, _transport) = setup(state);
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(names::BEGIN_MAP, vec![map_struct("m1")]))
            .await;
        {
            let mut settings = dispatcher.controller_mut().settings();
            settings.extend_time(60).await.unwrap();
            settings.keep_temp_settings();
        }
        dispatcher
            .handle(Notification::new(names::BEGIN_MAP, vec![map_struct("m2")]))
            .await;

        let mode = dispatcher.controller().state().mode();
        assert_eq!(mode.get(TIME_LIMIT_KEY), Some(&json!(360)));
        assert_eq!(mode.defaults()[TIME_LIMIT_KEY], json!(360));
    }

    #[tokio::test]
    async fn test_jukebox_skips_offline_requester() {
        let mut state = ServerState::new();
        let first = MapInfo::new("m1", "Map One", "m1.Map.Gbx");
        let second = MapInfo::new("m2", "Map Two", "m2.Map.Gbx");
        state.set_maps(vec![first.clone(), second.clone()]);
        let (mut dispatcher, transport) = setup(state);
        dispatcher.register(JukeboxPlugin);
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("p2"), json!(false)],
            ))
            .await;
        {
            let jukebox = dispatcher.controller_mut().jukebox_mut();
            jukebox.queue_map(first, PlayerInfo::from_login("p1"));
            jukebox.queue_map(second, PlayerInfo::from_login("p2"));
        }
        transport.clear_calls();

        dispatcher
            .handle(Notification::new(names::END_MATCH, vec![json!([]), json!(0)]))
            .await;

        let broadcasts = transport.calls_to("ChatSendServerMessage");
        assert_eq!(broadcasts.len(), 2);
        assert!(broadcasts[0][0].as_str().unwrap().contains("skipping Map One"));
        assert_eq!(
            transport.calls_to("ChooseNextMap"),
            vec![vec![json!("m2.Map.Gbx")]]
        );
        assert!(dispatcher.controller().jukebox().is_empty());
    }

    async fn jukebox_with_offline_first() -> (Dispatcher, Arc<LoopbackTransport>) {
        let mut state = ServerState::new();
        let first = MapInfo::new("m1", "Map One", "m1.Map.Gbx");
        let second = MapInfo::new("m2", "Map Two", "m2.Map.Gbx");
        state.set_maps(vec![first.clone(), second.clone()]);
        state.add_player(PlayerInfo::from_login("p2")).unwrap();
        let (mut dispatcher, transport) = setup(state);
        dispatcher.register(JukeboxPlugin);
        dispatcher.start().await;

        let jukebox = dispatcher.controller_mut().jukebox_mut();
        jukebox.queue_map(first, PlayerInfo::from_login("p1"));
        jukebox.queue_map(second, PlayerInfo::from_login("p2"));
        (dispatcher, transport)
    }

    #[tokio::test]
    async fn test_jukebox_commits_despite_failed_announcements() {
        let (mut dispatcher, transport) = jukebox_with_offline_first().await;
        transport.fail("ChatSendServerMessage", "chat unavailable");

        dispatcher
            .handle(Notification::new(names::END_MATCH, vec![json!([]), json!(0)]))
            .await;

        assert_eq!(
            transport.calls_to("ChooseNextMap"),
            vec![vec![json!("m2.Map.Gbx")]]
        );
        assert_eq!(transport.calls_to("ChatSendServerMessage").len(), 2);
        assert!(dispatcher.controller().jukebox().is_empty());
    }

    #[tokio::test]
    async fn test_jukebox_keeps_entry_when_commit_fails() {
        let (mut dispatcher, transport) = jukebox_with_offline_first().await;
        transport.fail("ChooseNextMap", "no such map");

        dispatcher
            .handle(Notification::new(names::END_MATCH, vec![json!([]), json!(0)]))
            .await;

        let jukebox = dispatcher.controller().jukebox();
        assert_eq!(
            jukebox.entries().map(|e| e.map.uid.as_str()).collect::<Vec<_>>(),
            vec!["m2"]
        );
        assert_eq!(jukebox.entries().next().unwrap().player.login, "p2");
    }

    #[tokio::test]
    async fn test_jukebox_priority_moves_queued_map() {
        let mut state = ServerState::new();
        state.set_maps(vec![
            MapInfo::new("m1", "Map One", "m1.Map.Gbx"),
            MapInfo::new("m2", "Map Two", "m2.Map.Gbx"),
        ]);
        state.add_player(PlayerInfo::from_login("alice")).unwrap();
        state.add_player(PlayerInfo::from_login("root")).unwrap();
        let (mut dispatcher, transport) = setup(state);
        dispatcher.register(JukeboxPlugin);
        dispatcher.start().await;

        for (login, text) in [
            ("alice", "/queue m1"),
            ("alice", "/queue m2"),
            ("root", "/admin jukebox-priority m2"),
        ] {
            dispatcher
                .handle(Notification::new(
                    names::PLAYER_CHAT,
                    vec![json!(3), json!(login), json!(text), json!(true)],
                ))
                .await;
        }

        let replies = transport.calls_to("ChatSendServerMessageToLogin");
        assert_eq!(replies[2][0], json!("Map Two moved to the front of the jukebox"));
        let jukebox = dispatcher.controller().jukebox();
        assert_eq!(
            jukebox.entries().map(|e| e.map.uid.as_str()).collect::<Vec<_>>(),
            vec!["m2", "m1"]
        );
        assert_eq!(jukebox.entries().next().unwrap().player.login, "alice");
    }

    #[tokio::test]
    async fn test_jukebox_commands() {
        let mut state = ServerState::new();
        state.set_maps(vec![MapInfo::new("m1", "Map One", "m1.Map.Gbx")]);
        state.add_player(PlayerInfo::from_login("alice")).unwrap();
        let (mut dispatcher, transport) = setup(state);
        dispatcher.register(JukeboxPlugin);
        dispatcher.start().await;

        for text in ["/queue m1", "/queue m1", "/queue zz", "/jukebox"] {
            dispatcher
                .handle(Notification::new(
                    names::PLAYER_CHAT,
                    vec![json!(3), json!("alice"), json!(text), json!(true)],
                ))
                .await;
        }

        let replies: Vec<String> = transport
            .calls_to("ChatSendServerMessageToLogin")
            .into_iter()
            .map(|args| args[0].as_str().unwrap().to_string())
            .collect();
        assert_eq!(replies[0], "Map One queued at position 1");
        assert_eq!(replies[1], "Map One is already queued");
        assert_eq!(replies[2], "Unknown map 'zz'");
        assert_eq!(replies[3], "1. Map One (alice)");
        assert_eq!(dispatcher.controller().jukebox().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_hooks_are_isolated() {
        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(Recorder::failing("err", &log, "database down"));
        dispatcher.register(Recorder::failing("boom", &log, "panic"));
        dispatcher.register(Recorder::new("ok", &log));
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("alice"), json!(false)],
            ))
            .await;

        assert_eq!(
            entries(&log),
            vec![
                "err:connect:alice:false",
                "boom:connect:alice:false",
                "ok:connect:alice:false",
            ]
        );
        assert!(dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_failed_load_is_excluded() {
        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(BrokenLoad);
        dispatcher.register(Recorder::new("ok", &log));
        dispatcher.start().await;

        assert_eq!(dispatcher.plugin_state("broken"), Some(PluginLoadState::Failed));
        assert_eq!(dispatcher.plugin_state("ok"), Some(PluginLoadState::Active));
        assert!(dispatcher.controller().commands().find("broken").is_none());

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("alice"), json!(false)],
            ))
            .await;
        assert_eq!(entries(&log), vec!["ok:connect:alice:false"]);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_notifications_fire_nothing() {
        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(Recorder::new("a", &log));
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(names::PLAYER_CONNECT, vec![json!("alice")]))
            .await;
        dispatcher
            .handle(Notification::new("ManiaPlanet.ServerStart", vec![]))
            .await;

        assert!(entries(&log).is_empty());
        assert_eq!(dispatcher.controller().state().player_count(), 0);
    }

    #[tokio::test]
    async fn test_notifications_before_start_are_dropped() {
        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(Recorder::new("a", &log));

        dispatcher
            .handle(Notification::new(
                names::PLAYER_CONNECT,
                vec![json!("alice"), json!(false)],
            ))
            .await;

        assert_eq!(dispatcher.state(), DispatcherState::Idle);
        assert!(entries(&log).is_empty());
        assert_eq!(dispatcher.controller().state().player_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_and_status() {
        let mut state = ServerState::new();
        state.add_player(PlayerInfo::from_login("alice")).unwrap();
        let (mut dispatcher, _transport) = setup(state);
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::PLAYER_DISCONNECT,
                vec![json!("alice"), json!("")],
            ))
            .await;
        dispatcher
            .handle(Notification::new(
                names::PLAYER_DISCONNECT,
                vec![json!("alice"), json!("")],
            ))
            .await;
        dispatcher
            .handle(Notification::new(
                names::STATUS_CHANGED,
                vec![json!(4), json!("Running - Play")],
            ))
            .await;

        let state = dispatcher.controller().state();
        assert!(!state.is_online("alice"));
        assert!(state.status().is_playing());
    }

    #[tokio::test]
    async fn test_map_list_refresh() {
        let (mut dispatcher, transport) = setup(ServerState::new());
        transport.respond("GetMapList", json!([map_struct("a"), map_struct("b")]));
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(
                names::MAP_LIST_MODIFIED,
                vec![json!(0), json!(1), json!(false)],
            ))
            .await;
        assert!(dispatcher.controller().state().maps().is_empty());

        dispatcher
            .handle(Notification::new(
                names::MAP_LIST_MODIFIED,
                vec![json!(0), json!(1), json!(true)],
            ))
            .await;
        assert!(dispatcher.controller().state().find_map("b").is_some());
    }

    #[tokio::test]
    async fn test_run_until_stream_closes() {
        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(Recorder::new("a", &log));
        dispatcher.start().await;

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        tx.send(Notification::new(
            names::PLAYER_CONNECT,
            vec![json!("alice"), json!(false)],
        ))
        .await
        .unwrap();
        drop(tx);

        dispatcher.run(&mut rx, std::future::pending()).await;

        assert_eq!(dispatcher.state(), DispatcherState::Shutdown);
        assert_eq!(entries(&log), vec!["a:connect:alice:false", "a:unload"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let (mut dispatcher, transport) = setup(ServerState::new());
        dispatcher.start().await;
        let (_tx, mut rx) = tokio::sync::mpsc::channel::<Notification>(8);

        dispatcher.run(&mut rx, async {}).await;

        assert_eq!(dispatcher.state(), DispatcherState::Shutdown);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_requested_shutdown_unloads_in_reverse() {
        struct Stopper;

        #[async_trait]
        impl Plugin for Stopper {
            fn name(&self) -> &str {
                "stopper"
            }

            async fn on_match_begin(
                &mut self,
                ctl: &mut Controller,
                _event: &MatchBegin,
            ) -> anyhow::Result<()> {
                ctl.request_shutdown();
                Ok(())
            }
        }

        let log = Log::default();
        let (mut dispatcher, _transport) = setup(ServerState::new());
        dispatcher.register(Recorder::new("first", &log));
        dispatcher.register(Stopper);
        dispatcher.register(Recorder::new("last", &log));
        dispatcher.start().await;

        dispatcher
            .handle(Notification::new(names::BEGIN_MATCH, vec![]))
            .await;

        assert_eq!(dispatcher.state(), DispatcherState::Shutdown);
        assert_eq!(entries(&log), vec!["last:unload", "first:unload"]);
    }
}
