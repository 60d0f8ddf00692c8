//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ControllerConfig, LogFormat, LogOutput, LoggingConfig, PodiumConfig, ServerConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PodiumConfig) -> ConfigResult<()> {
    validate_server_config(&config.server)?;
    validate_controller_config(&config.controller)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    validate_url(&server.url)?;

    if server.login.is_empty() {
        return Err(ConfigError::missing_field("server.login"));
    }

    if server.timeout_ms == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    Ok(())
}

fn validate_controller_config(controller: &ControllerConfig) -> ConfigResult<()> {
    let keyword = &controller.command_keyword;
    if keyword.is_empty() || keyword.starts_with('/') || keyword.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Invalid command keyword '{keyword}': must be a single word without a leading '/'"
        )));
    }

    if controller.extend_seconds <= 0 {
        return Err(ConfigError::validation(
            "controller.extend_seconds must be greater than 0",
        ));
    }

    if controller.match_settings_file.is_empty() {
        return Err(ConfigError::missing_field("controller.match_settings_file"));
    }

    let mut seen = HashSet::new();
    for admin in &controller.admins {
        if admin.is_empty() {
            return Err(ConfigError::validation("Admin logins cannot be empty"));
        }
        if !seen.insert(admin) {
            return Err(ConfigError::validation(format!(
                "Duplicate admin login: {admin}"
            )));
        }
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the `json-log` feature",
        ));
    }

    Ok(())
}

fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("server.url"));
    }

    let valid_schemes = ["ws://", "wss://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&PodiumConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_url_scheme() {
        let mut config = PodiumConfig::default();
        config.server.url = "http://127.0.0.1:5000".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_keyword() {
        let mut config = PodiumConfig::default();
        config.controller.command_keyword = "/admin".to_string();
        assert!(validate_config(&config).is_err());

        config.controller.command_keyword = "op".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_duplicate_admin() {
        let mut config = PodiumConfig::default();
        config.controller.admins = vec!["root".to_string(), "root".to_string()];
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = PodiumConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }
}
