//! Mode configuration and its reconciliation with the server.
//!
//! A [`ModeConfiguration`] holds two mappings of script settings:
//!
//! - **default** persists across maps until explicitly superseded;
//! - **temporary** is reset to a copy of default at the start of every map
//!   and is what admins change during a map.
//!
//! Both mappings always have the same key set, fixed when the configuration
//! is loaded from the server. [`SettingsReconciler`] is the only way to
//! change them and the only component that pushes them to the server.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{SettingsError, SettingsResult};
use crate::remote::Remote;

/// Script setting holding the round time limit, in seconds.
pub const TIME_LIMIT_KEY: &str = "S_TimeLimit";

/// Script settings keyed by name.
pub type SettingsMap = Map<String, Value>;

/// Default and temporary mode settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeConfiguration {
    defaults: SettingsMap,
    temporary: SettingsMap,
}

impl ModeConfiguration {
    /// Creates a configuration whose default and temporary mappings are both
    /// `initial`.
    pub fn new(initial: SettingsMap) -> Self {
        Self {
            temporary: initial.clone(),
            defaults: initial,
        }
    }

    /// Settings that persist across maps.
    pub fn defaults(&self) -> &SettingsMap {
        &self.defaults
    }

    /// Settings in effect for the current map.
    pub fn temporary(&self) -> &SettingsMap {
        &self.temporary
    }

    /// Returns the temporary value of `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.temporary.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// Returns `true` when the temporary mapping differs from the default one.
    pub fn is_diverged(&self) -> bool {
        self.temporary != self.defaults
    }
}

/// Applies settings operations to a [`ModeConfiguration`] and the server.
///
/// Obtained from [`Controller::settings`](crate::Controller::settings).
/// Local changes made with [`change_setting`](Self::change_setting) and
/// [`reset_setting`](Self::reset_setting) are not sent to the server until
/// [`apply_temp_settings`](Self::apply_temp_settings) is called.
pub struct SettingsReconciler<'a> {
    mode: &'a mut ModeConfiguration,
    remote: &'a Remote,
    save_path: String,
}

impl<'a> SettingsReconciler<'a> {
    pub(crate) fn new(mode: &'a mut ModeConfiguration, remote: &'a Remote, save_path: String) -> Self {
        Self {
            mode,
            remote,
            save_path,
        }
    }

    /// Read access to the configuration.
    pub fn mode(&self) -> &ModeConfiguration {
        self.mode
    }

    /// Adds `seconds` to the temporary time limit and applies the temporary
    /// mapping remotely. Returns the new time limit.
    pub async fn extend_time(&mut self, seconds: i64) -> SettingsResult<i64> {
        let current = match self.mode.temporary.get(TIME_LIMIT_KEY) {
            None => return Err(SettingsError::NotExtendable),
            Some(value) => as_integer(value).ok_or_else(|| SettingsError::NotNumeric {
                key: TIME_LIMIT_KEY.to_string(),
            })?,
        };
        let extended = current
            .checked_add(seconds)
            .ok_or_else(|| SettingsError::OutOfRange {
                key: TIME_LIMIT_KEY.to_string(),
            })?;
        self.mode
            .temporary
            .insert(TIME_LIMIT_KEY.to_string(), Value::from(extended));
        self.apply_temp_settings().await?;
        info!(from = current, to = extended, "Time limit extended");
        Ok(extended)
    }

    /// Overwrites a temporary setting locally.
    pub fn change_setting(&mut self, key: &str, value: Value) -> SettingsResult<()> {
        let slot = self
            .mode
            .temporary
            .get_mut(key)
            .ok_or_else(|| SettingsError::UnknownKey {
                key: key.to_string(),
            })?;
        debug!(key, old = %slot, new = %value, "Setting changed");
        *slot = value;
        Ok(())
    }

    /// Restores one temporary setting from its default value, locally.
    pub fn reset_setting(&mut self, key: &str) -> SettingsResult<()> {
        let default = self
            .mode
            .defaults
            .get(key)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownKey {
                key: key.to_string(),
            })?;
        self.mode.temporary.insert(key.to_string(), default);
        Ok(())
    }

    /// Pushes the whole temporary mapping to the server.
    pub async fn apply_temp_settings(&self) -> SettingsResult<()> {
        self.remote
            .set_mode_script_settings(&self.mode.temporary)
            .await?;
        Ok(())
    }

    /// Pushes the default mapping to the server and resets temporary to it.
    ///
    /// The local reset happens even when the push fails; the error is still
    /// returned.
    pub async fn reset_settings(&mut self) -> SettingsResult<()> {
        let pushed = self.remote.set_mode_script_settings(&self.mode.defaults).await;
        self.mode.temporary = self.mode.defaults.clone();
        pushed?;
        Ok(())
    }

    /// Promotes the temporary mapping to be the new default. Local only.
    pub fn keep_temp_settings(&mut self) {
        self.mode.defaults = self.mode.temporary.clone();
        info!("Temporary settings promoted to defaults");
    }

    /// Asks the server to save the match settings file. Returns the path used.
    pub async fn save_settings_to_file(&self) -> SettingsResult<String> {
        self.remote.save_match_settings(self.save_path.clone()).await?;
        info!(path = %self.save_path, "Match settings saved");
        Ok(self.save_path.clone())
    }

    /// Map transition: temporary is re-copied from default. When it had
    /// diverged, the default mapping is pushed too. Returns whether a push
    /// happened.
    pub async fn begin_map(&mut self) -> SettingsResult<bool> {
        if !self.mode.is_diverged() {
            return Ok(false);
        }
        debug!("Temporary settings diverged; restoring defaults for the new map");
        self.reset_settings().await?;
        Ok(true)
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Builds the path handed to `SaveMatchSettings`.
pub fn match_settings_path(maps_directory: &str, file_name: &str) -> String {
    let base = maps_directory.trim_end_matches(['/', '\\']);
    if base.is_empty() {
        format!("MatchSettings/{file_name}")
    } else {
        format!("{base}/MatchSettings/{file_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::LoopbackTransport;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn initial() -> SettingsMap {
        match json!({ "S_TimeLimit": 300, "S_WarmUpNb": 1, "S_ForceLapsNb": -1 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_extend_time_applies_temporary() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(initial());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        assert_eq!(settings.extend_time(60).await.unwrap(), 360);

        assert_eq!(mode.get(TIME_LIMIT_KEY), Some(&json!(360)));
        assert_eq!(mode.defaults()[TIME_LIMIT_KEY], json!(300));
        let pushed = transport.calls_to("SetModeScriptSettings");
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0][0][TIME_LIMIT_KEY], json!(360));
    }

    #[tokio::test]
    async fn test_extend_time_without_time_limit() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(SettingsMap::new());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        let err = assert_err!(settings.extend_time(60).await);
        assert!(matches!(err, SettingsError::NotExtendable));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_extend_time_overflow_is_rejected() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(initial());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        let err = assert_err!(settings.extend_time(i64::MAX).await);
        assert!(matches!(err, SettingsError::OutOfRange { .. }));
        assert_eq!(mode.get(TIME_LIMIT_KEY), Some(&json!(300)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_extend_time_rejects_fractional_limit() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(match json!({ "S_TimeLimit": 300.5 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        });

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        let err = assert_err!(settings.extend_time(60).await);
        assert!(matches!(err, SettingsError::NotNumeric { .. }));
        assert_eq!(mode.get(TIME_LIMIT_KEY), Some(&json!(300.5)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_keys_are_never_introduced() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport);
        let mut mode = ModeConfiguration::new(initial());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        assert_err!(settings.change_setting("S_Nope", json!(1)));
        assert_err!(settings.reset_setting("S_Nope"));
        assert!(!mode.temporary().contains_key("S_Nope"));
        assert!(!mode.defaults().contains_key("S_Nope"));
    }

    #[tokio::test]
    async fn test_change_is_local_until_applied() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(initial());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        assert_ok!(settings.change_setting("S_WarmUpNb", json!(3)));
        assert!(transport.calls().is_empty());

        assert_ok!(settings.reset_setting("S_WarmUpNb"));
        assert_ok!(settings.change_setting("S_ForceLapsNb", json!(5)));
        assert_ok!(settings.apply_temp_settings().await);

        let pushed = transport.calls_to("SetModeScriptSettings");
        assert_eq!(pushed[0][0]["S_WarmUpNb"], json!(1));
        assert_eq!(pushed[0][0]["S_ForceLapsNb"], json!(5));
    }

    #[tokio::test]
    async fn test_reset_settings_matches_remote() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(initial());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        assert_ok!(settings.change_setting("S_WarmUpNb", json!(0)));
        assert_ok!(settings.reset_settings().await);

        assert_eq!(mode.temporary(), mode.defaults());
        let pushed = transport.calls_to("SetModeScriptSettings");
        assert_eq!(pushed.last().unwrap()[0], Value::Object(mode.defaults().clone()));
    }

    #[tokio::test]
    async fn test_keep_then_begin_map() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(initial());

        let mut settings = SettingsReconciler::new(&mut mode, &remote, String::new());
        assert_ok!(settings.change_setting("S_WarmUpNb", json!(2)));
        settings.keep_temp_settings();
        assert!(!assert_ok!(settings.begin_map().await));

        assert_eq!(mode.defaults()["S_WarmUpNb"], json!(2));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_path() {
        let (transport, _rx) = LoopbackTransport::new();
        let remote = Remote::new(transport.clone());
        let mut mode = ModeConfiguration::new(initial());
        let path = match_settings_path("/srv/UserData/Maps/", "podium.txt");

        let settings = SettingsReconciler::new(&mut mode, &remote, path);
        let saved = assert_ok!(settings.save_settings_to_file().await);
        assert_eq!(saved, "/srv/UserData/Maps/MatchSettings/podium.txt");
        assert_eq!(
            transport.calls_to("SaveMatchSettings"),
            vec![vec![json!("/srv/UserData/Maps/MatchSettings/podium.txt")]]
        );
        assert_eq!(match_settings_path("", "x.txt"), "MatchSettings/x.txt");
    }
}
