//! Built-in `help` and administration commands.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/help` | private list of commands (privileged ones for administrators) |
//! | `/admin shutdown` | broadcast, then orderly termination |
//! | `/admin extend [seconds]` | extend the time limit |
//! | `/admin set <key> <value>` | change a temporary setting (JSON value or plain string) |
//! | `/admin reset <key>` | restore one temporary setting |
//! | `/admin apply` | push the temporary settings |
//! | `/admin resetall` | push and restore the defaults |
//! | `/admin keep` | promote the temporary settings to defaults |
//! | `/admin save` | save the match settings file |
//! | `/admin settings` | private listing of the temporary settings |
//! | `/admin skip` / `/admin restart` | next map / restart map |

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use podium_framework::{CommandHandler, CommandInvocation, Controller, Plugin, PluginLoadContext};

/// Plugin owning the built-in commands.
#[derive(Debug, Clone)]
pub struct AdminPlugin {
    extend_seconds: i64,
}

impl AdminPlugin {
    pub const NAME: &'static str = "admin";

    pub fn new(extend_seconds: i64) -> Self {
        Self { extend_seconds }
    }
}

impl Default for AdminPlugin {
    fn default() -> Self {
        Self::new(300)
    }
}

#[async_trait]
impl Plugin for AdminPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn on_load(&mut self, ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
        let registrar = ctx.registrar();
        registrar.register_command("help", AdminCommand::Help, "List the available commands");

        let privileged = [
            (
                "shutdown",
                AdminCommand::Shutdown,
                "Stop the controller",
            ),
            (
                "extend",
                AdminCommand::Extend {
                    default_seconds: self.extend_seconds,
                },
                "Extend the time limit: extend [seconds]",
            ),
            (
                "set",
                AdminCommand::Set,
                "Change a temporary setting: set <key> <value>",
            ),
            (
                "reset",
                AdminCommand::Reset,
                "Restore one temporary setting: reset <key>",
            ),
            ("apply", AdminCommand::Apply, "Push the temporary settings"),
            (
                "resetall",
                AdminCommand::ResetAll,
                "Restore and push the default settings",
            ),
            (
                "keep",
                AdminCommand::Keep,
                "Make the temporary settings the defaults",
            ),
            ("save", AdminCommand::Save, "Save the match settings file"),
            (
                "settings",
                AdminCommand::Settings,
                "Show the temporary settings",
            ),
            ("skip", AdminCommand::Skip, "Go to the next map"),
            ("restart", AdminCommand::Restart, "Restart the current map"),
        ];
        for (name, command, description) in privileged {
            registrar.register_privileged_command(name, command, description);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum AdminCommand {
    Help,
    Shutdown,
    Extend { default_seconds: i64 },
    Set,
    Reset,
    Apply,
    ResetAll,
    Keep,
    Save,
    Settings,
    Skip,
    Restart,
}

#[async_trait]
impl CommandHandler for AdminCommand {
    async fn handle(&self, ctl: &mut Controller, inv: &CommandInvocation) -> anyhow::Result<()> {
        let reply = match *self {
            Self::Help => help(ctl, &inv.login),
            Self::Shutdown => {
                info!(login = %inv.login, "Shutdown requested by administrator");
                ctl.remote().chat_send("Controller shutting down").await?;
                ctl.request_shutdown();
                return Ok(());
            }
            Self::Extend { default_seconds } => match inv.arg(0).map(str::parse::<i64>) {
                Some(Err(_)) => "Usage: extend [seconds]".to_string(),
                Some(Ok(seconds)) => extend(ctl, seconds).await,
                None => extend(ctl, default_seconds).await,
            },
            Self::Set => match inv.arg(0) {
                Some(key) if inv.args.len() > 1 => {
                    let raw = inv.rest(1);
                    let value = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
                    match ctl.settings().change_setting(key, value.clone()) {
                        Ok(()) => format!("{key} set to {value} (use apply to push)"),
                        Err(e) => e.to_string(),
                    }
                }
                _ => "Usage: set <key> <value>".to_string(),
            },
            Self::Reset => match inv.arg(0) {
                Some(key) => match ctl.settings().reset_setting(key) {
                    Ok(()) => format!("{key} restored (use apply to push)"),
                    Err(e) => e.to_string(),
                },
                None => "Usage: reset <key>".to_string(),
            },
            Self::Apply => outcome(ctl.settings().apply_temp_settings().await, "Settings applied"),
            Self::ResetAll => outcome(
                ctl.settings().reset_settings().await,
                "Default settings restored",
            ),
            Self::Keep => {
                ctl.settings().keep_temp_settings();
                "Temporary settings are now the defaults".to_string()
            }
            Self::Save => match ctl.settings().save_settings_to_file().await {
                Ok(path) => format!("Match settings saved to {path}"),
                Err(e) => e.to_string(),
            },
            Self::Settings => settings_listing(ctl),
            Self::Skip => {
                ctl.remote().next_map().await?;
                "Skipping to the next map".to_string()
            }
            Self::Restart => {
                ctl.remote().restart_map().await?;
                "Restarting the map".to_string()
            }
        };
        ctl.remote().chat_send_to(inv.login.as_str(), reply).await?;
        Ok(())
    }
}

async fn extend(ctl: &mut Controller, seconds: i64) -> String {
    match ctl.settings().extend_time(seconds).await {
        Ok(limit) => format!("Time limit extended to {limit}s"),
        Err(e) => e.to_string(),
    }
}

fn outcome<E: std::fmt::Display>(result: Result<(), E>, success: &str) -> String {
    match result {
        Ok(()) => success.to_string(),
        Err(e) => e.to_string(),
    }
}

fn help(ctl: &Controller, login: &str) -> String {
    let commands = ctl.commands();
    let mut lines: Vec<String> = commands
        .commands()
        .iter()
        .map(|c| format!("/{} - {}", c.name, c.description))
        .collect();
    if ctl.is_admin(login) {
        lines.extend(
            commands
                .privileged_commands()
                .iter()
                .map(|c| format!("/{} {} - {}", commands.keyword(), c.name, c.description)),
        );
    }
    lines.join("\n")
}

fn settings_listing(ctl: &Controller) -> String {
    let mode = ctl.state().mode();
    if mode.temporary().is_empty() {
        return "No mode script settings".to_string();
    }
    mode.temporary()
        .iter()
        .map(|(key, value)| {
            let changed = mode.defaults().get(key) != Some(value);
            format!("{}{key} = {value}", if changed { "*" } else { "" })
        })
        .collect::<Vec<_>>()
        .join("\n")
}
