//! Chat command registry.
//!
//! Commands live in two disjoint registries:
//!
//! | Registry | Typed as | Gate |
//! |----------|----------|------|
//! | regular | `/name args…` | none |
//! | privileged | `/<keyword> name args…` | sender must be an administrator |
//!
//! The keyword defaults to [`DEFAULT_PRIVILEGED_KEYWORD`] and can never be
//! used as a regular command name. Names are unique within each registry;
//! the first registration wins and later ones are refused.
//!
//! Plugins register through a [`Registrar`], which logs refusals instead of
//! returning them.

mod split;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use split::{CommandLine, parse_command_line, shell_split};

use crate::controller::Controller;
use crate::error::{RegistrationError, RegistrationResult};

/// Reserved first word of privileged command lines.
pub const DEFAULT_PRIVILEGED_KEYWORD: &str = "admin";

/// A resolved command invocation handed to a [`CommandHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Login of the player who typed the command.
    pub login: String,
    pub name: String,
    pub args: Vec<String>,
    pub privileged: bool,
}

impl CommandInvocation {
    /// Returns the argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Joins the arguments from `index` on with single spaces.
    pub fn rest(&self, index: usize) -> String {
        self.args.get(index..).unwrap_or_default().join(" ")
    }
}

/// Code run when a command matches.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctl: &mut Controller,
        invocation: &CommandInvocation,
    ) -> anyhow::Result<()>;
}

/// A registered chat command.
#[derive(Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    /// Name of the plugin that registered the command.
    pub owner: String,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            owner: String::new(),
            handler,
        }
    }

    /// Sets the owning plugin (builder pattern).
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// The two command tables.
#[derive(Debug)]
pub struct CommandRegistry {
    keyword: String,
    regular: Vec<CommandDefinition>,
    privileged: Vec<CommandDefinition>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVILEGED_KEYWORD)
    }
}

impl CommandRegistry {
    /// Creates an empty registry using `keyword` for privileged dispatch.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            regular: Vec::new(),
            privileged: Vec::new(),
        }
    }

    /// The privileged-dispatch keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Adds a regular command.
    pub fn register_command(&mut self, def: CommandDefinition) -> RegistrationResult<()> {
        validate(&def)?;
        if def.name == self.keyword {
            return Err(RegistrationError::ReservedName { name: def.name });
        }
        insert(&mut self.regular, def, "regular")
    }

    /// Adds a privileged command.
    pub fn register_privileged_command(
        &mut self,
        def: CommandDefinition,
    ) -> RegistrationResult<()> {
        validate(&def)?;
        insert(&mut self.privileged, def, "privileged")
    }

    pub fn find(&self, name: &str) -> Option<&CommandDefinition> {
        self.regular.iter().find(|d| d.name == name)
    }

    pub fn find_privileged(&self, name: &str) -> Option<&CommandDefinition> {
        self.privileged.iter().find(|d| d.name == name)
    }

    /// Regular commands in registration order.
    pub fn commands(&self) -> &[CommandDefinition] {
        &self.regular
    }

    /// Privileged commands in registration order.
    pub fn privileged_commands(&self) -> &[CommandDefinition] {
        &self.privileged
    }

    /// Drops every command owned by `owner`.
    pub fn remove_owned_by(&mut self, owner: &str) {
        self.regular.retain(|d| d.owner != owner);
        self.privileged.retain(|d| d.owner != owner);
    }
}

fn validate(def: &CommandDefinition) -> RegistrationResult<()> {
    if def.name.is_empty() {
        return Err(RegistrationError::EmptyName);
    }
    if def.name.starts_with('/') {
        return Err(RegistrationError::InvalidName {
            name: def.name.clone(),
            reason: "must not start with '/'",
        });
    }
    if def.name.chars().any(char::is_whitespace) {
        return Err(RegistrationError::InvalidName {
            name: def.name.clone(),
            reason: "must not contain whitespace",
        });
    }
    if def.description.trim().is_empty() {
        return Err(RegistrationError::EmptyDescription {
            name: def.name.clone(),
        });
    }
    Ok(())
}

fn insert(
    table: &mut Vec<CommandDefinition>,
    def: CommandDefinition,
    registry: &'static str,
) -> RegistrationResult<()> {
    if let Some(existing) = table.iter().find(|d| d.name == def.name) {
        return Err(RegistrationError::Duplicate {
            name: def.name,
            owner: existing.owner.clone(),
            registry,
        });
    }
    debug!(command = %def.name, owner = %def.owner, registry, "Command registered");
    table.push(def);
    Ok(())
}

// =============================================================================
// Registrar
// =============================================================================

/// Plugin-facing registration handle.
///
/// Stamps every definition with the owning plugin's name and logs rejected
/// registrations instead of returning them.
pub struct Registrar<'a> {
    registry: &'a mut CommandRegistry,
    owner: String,
}

impl<'a> Registrar<'a> {
    pub fn new(registry: &'a mut CommandRegistry, owner: impl Into<String>) -> Self {
        Self {
            registry,
            owner: owner.into(),
        }
    }

    pub fn register_command<H>(&mut self, name: &str, handler: H, description: &str)
    where
        H: CommandHandler + 'static,
    {
        let def = CommandDefinition::new(name, description, Arc::new(handler))
            .owned_by(self.owner.as_str());
        if let Err(e) = self.registry.register_command(def) {
            warn!(plugin = %self.owner, error = %e, "Command registration rejected");
        }
    }

    pub fn register_privileged_command<H>(&mut self, name: &str, handler: H, description: &str)
    where
        H: CommandHandler + 'static,
    {
        let def = CommandDefinition::new(name, description, Arc::new(handler))
            .owned_by(self.owner.as_str());
        if let Err(e) = self.registry.register_privileged_command(def) {
            warn!(plugin = %self.owner, error = %e, "Privileged command registration rejected");
        }
    }

    /// Read access to everything registered so far.
    pub fn registry(&self) -> &CommandRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _: &mut Controller, _: &CommandInvocation) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn def(name: &str, description: &str) -> CommandDefinition {
        CommandDefinition::new(name, description, Arc::new(Noop))
    }

    #[test]
    fn test_duplicate_is_rejected_first_wins() {
        let mut registry = CommandRegistry::default();
        registry
            .register_command(def("jukebox", "first").owned_by("a"))
            .unwrap();
        let err = registry
            .register_command(def("jukebox", "second").owned_by("b"))
            .unwrap_err();

        assert!(matches!(err, RegistrationError::Duplicate { ref owner, .. } if owner == "a"));
        assert_eq!(registry.commands().len(), 1);
        assert_eq!(registry.find("jukebox").unwrap().description, "first");
    }

    #[test]
    fn test_reserved_keyword_only_rejected_as_regular() {
        let mut registry = CommandRegistry::default();
        assert_eq!(
            registry.register_command(def("admin", "nope")).unwrap_err(),
            RegistrationError::ReservedName {
                name: "admin".into()
            }
        );
        assert!(registry.find("admin").is_none());

        let mut custom = CommandRegistry::new("op");
        assert!(custom.register_command(def("admin", "fine here")).is_ok());
        assert!(custom.register_command(def("op", "reserved")).is_err());
    }

    #[test]
    fn test_invalid_definitions_are_not_stored() {
        let mut registry = CommandRegistry::default();
        assert_eq!(
            registry.register_command(def("", "x")).unwrap_err(),
            RegistrationError::EmptyName
        );
        assert!(registry.register_command(def("/help", "x")).is_err());
        assert!(registry.register_command(def("two words", "x")).is_err());
        assert!(registry.register_privileged_command(def("kick", " ")).is_err());
        assert!(registry.commands().is_empty());
        assert!(registry.privileged_commands().is_empty());
    }

    #[test]
    fn test_registries_are_disjoint() {
        let mut registry = CommandRegistry::default();
        registry.register_command(def("skip", "vote skip")).unwrap();
        registry
            .register_privileged_command(def("skip", "force skip"))
            .unwrap();
        assert_eq!(registry.find("skip").unwrap().description, "vote skip");
        assert_eq!(
            registry.find_privileged("skip").unwrap().description,
            "force skip"
        );
    }

    #[test]
    fn test_registrar_stamps_owner_and_swallows_errors() {
        let mut registry = CommandRegistry::default();
        {
            let mut registrar = Registrar::new(&mut registry, "greeter");
            registrar.register_command("hello", Noop, "Say hello");
            registrar.register_command("hello", Noop, "Say hello again");
            registrar.register_command("admin", Noop, "Sneaky");
            registrar.register_privileged_command("mute", Noop, "Mute a player");
            assert_eq!(registrar.registry().commands().len(), 1);
        }
        assert_eq!(registry.find("hello").unwrap().owner, "greeter");
        assert_eq!(registry.privileged_commands().len(), 1);

        registry.remove_owned_by("greeter");
        assert!(registry.commands().is_empty());
        assert!(registry.privileged_commands().is_empty());
    }

    #[test]
    fn test_invocation_helpers() {
        let inv = CommandInvocation {
            login: "alice".into(),
            name: "set".into(),
            args: vec!["S_Name".into(), "Winter".into(), "Cup".into()],
            privileged: true,
        };
        assert_eq!(inv.arg(0), Some("S_Name"));
        assert_eq!(inv.arg(5), None);
        assert_eq!(inv.rest(1), "Winter Cup");
        assert_eq!(inv.rest(9), "");
    }
}
