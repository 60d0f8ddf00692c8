use async_trait::async_trait;
use tracing::{info, warn};

use podium_core::event::MatchEnd;

use crate::command::{CommandHandler, CommandInvocation};
use crate::controller::Controller;
use crate::jukebox::JukeboxEntry;
use crate::plugin::{Plugin, PluginLoadContext};

/// Owns the jukebox consumption protocol and the jukebox chat commands.
#[derive(Debug, Default)]
pub struct JukeboxPlugin;

impl JukeboxPlugin {
    pub const NAME: &'static str = "jukebox";
}

#[async_trait]
impl Plugin for JukeboxPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn on_load(&mut self, ctx: &mut PluginLoadContext<'_>) -> anyhow::Result<()> {
        let registrar = ctx.registrar();
        registrar.register_command("jukebox", JukeboxCommand::List, "List the queued maps");
        registrar.register_command(
            "queue",
            JukeboxCommand::Queue,
            "Queue a map by uid: /queue <uid>",
        );
        registrar.register_privileged_command(
            "jukebox-clear",
            JukeboxCommand::Clear,
            "Empty the jukebox",
        );
        registrar.register_privileged_command(
            "jukebox-priority",
            JukeboxCommand::Priority,
            "Put a map at the front of the jukebox: jukebox-priority <uid>",
        );
        Ok(())
    }

    async fn on_match_end(&mut self, ctl: &mut Controller, _event: &MatchEnd) -> anyhow::Result<()> {
        advance(ctl).await?;
        Ok(())
    }
}

/// Pops entries until one whose requester is still online is found, then
/// commits it as the next map. Offline requesters' entries are skipped with a
/// public announcement. Returns the committed entry.
///
/// Announcements are best effort. When `ChooseNextMap` itself fails, the
/// entry goes back to the front of the queue and the error is returned.
pub async fn advance(ctl: &mut Controller) -> anyhow::Result<Option<JukeboxEntry>> {
    while let Some(entry) = ctl.jukebox_mut().unqueue_map() {
        if !ctl.state().is_online(&entry.player.login) {
            info!(map = %entry.map.uid, player = %entry.player.login, "Skipping jukebox entry of offline player");
            announce(
                ctl,
                format!(
                    "Jukebox: skipping {} ({} left the server)",
                    entry.map.name, entry.player.nickname
                ),
            )
            .await;
            continue;
        }

        if let Err(e) = ctl.remote().choose_next_map(entry.map.file_name.clone()).await {
            warn!(map = %entry.map.uid, error = %e, "Failed to commit jukebox map; entry kept");
            ctl.jukebox_mut().requeue_front(entry);
            return Err(e.into());
        }
        info!(map = %entry.map.uid, player = %entry.player.login, "Jukebox map committed");
        announce(
            ctl,
            format!(
                "Jukebox: next map is {} (requested by {})",
                entry.map.name, entry.player.nickname
            ),
        )
        .await;
        return Ok(Some(entry));
    }
    Ok(None)
}

async fn announce(ctl: &Controller, message: String) {
    if let Err(e) = ctl.remote().chat_send(message).await {
        warn!(error = %e, "Failed to send jukebox announcement");
    }
}

#[derive(Debug, Clone, Copy)]
enum JukeboxCommand {
    List,
    Queue,
    Clear,
    Priority,
}

#[async_trait]
impl CommandHandler for JukeboxCommand {
    async fn handle(&self, ctl: &mut Controller, inv: &CommandInvocation) -> anyhow::Result<()> {
        let reply = match self {
            Self::List => {
                if ctl.jukebox().is_empty() {
                    "Jukebox is empty".to_string()
                } else {
                    ctl.jukebox()
                        .entries()
                        .enumerate()
                        .map(|(i, e)| format!("{}. {} ({})", i + 1, e.map.name, e.player.nickname))
                        .collect::<Vec<_>>()
                        .join(" | ")
                }
            }
            Self::Clear => {
                let dropped = ctl.jukebox().len();
                ctl.jukebox_mut().reset();
                format!("Jukebox cleared ({dropped} entries)")
            }
            Self::Queue | Self::Priority => queue(ctl, inv, matches!(self, Self::Priority)),
        };
        ctl.remote().chat_send_to(inv.login.as_str(), reply).await?;
        Ok(())
    }
}

fn queue(ctl: &mut Controller, inv: &CommandInvocation, priority: bool) -> String {
    let Some(uid) = inv.arg(0) else {
        return format!("Usage: /{} <map uid>", inv.name);
    };
    let Some(map) = ctl.state().find_map(uid).cloned() else {
        return format!("Unknown map '{uid}'");
    };
    if ctl.jukebox().contains_map(uid) {
        if priority && ctl.jukebox_mut().promote(uid) {
            return format!("{} moved to the front of the jukebox", map.name);
        }
        return format!("{} is already queued", map.name);
    }
    let Some(player) = ctl.state().get_player(&inv.login).cloned() else {
        warn!(login = %inv.login, "Jukebox request from a player not on the roster");
        return "You are not on the roster".to_string();
    };

    let name = map.name.clone();
    if priority {
        ctl.jukebox_mut().priority_add(map, player);
        format!("{name} will be played next")
    } else {
        ctl.jukebox_mut().queue_map(map, player);
        format!("{name} queued at position {}", ctl.jukebox().len())
    }
}
