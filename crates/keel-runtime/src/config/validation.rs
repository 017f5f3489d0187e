//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ChatConfig, KeelConfig, LogOutput, LoggingConfig, PathsConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &KeelConfig) -> ConfigResult<()> {
    if config.host.name.trim().is_empty() {
        return Err(ConfigError::missing_field("host.name"));
    }
    validate_logging(&config.logging)?;
    validate_paths(&config.paths)?;
    validate_chat(&config.chat)?;

    if config.persistence.enabled && config.persistence.table.trim().is_empty() {
        return Err(ConfigError::missing_field("persistence.table"));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Log filter target cannot be empty: {target:?}"
        )));
    }
    Ok(())
}

fn validate_paths(paths: &PathsConfig) -> ConfigResult<()> {
    let name = paths.manifest_file_name.trim();
    if name.is_empty() {
        return Err(ConfigError::missing_field("paths.manifest_file_name"));
    }
    if name.contains(['/', '\\']) {
        return Err(ConfigError::validation(format!(
            "Manifest file name must not contain a path separator: {name}"
        )));
    }
    Ok(())
}

/// A chat client needs both credentials before it may start.
fn validate_chat(chat: &ChatConfig) -> ConfigResult<()> {
    if !chat.enabled {
        return Ok(());
    }
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !present(&chat.token) {
        return Err(ConfigError::missing_field("chat.token"));
    }
    if !present(&chat.guild_id) {
        return Err(ConfigError::missing_field("chat.guild_id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&KeelConfig::default()).is_ok());
    }

    #[test]
    fn test_chat_requires_credentials() {
        let mut config = KeelConfig::default();
        config.chat.enabled = true;
        config.chat.token = Some("secret".into());

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::MissingField { ref field }) if field == "chat.guild_id"));

        config.chat.guild_id = Some("1234".into());
        assert!(validate_config(&config).is_ok());

        config.chat.token = Some("  ".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = KeelConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("keel.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_manifest_name_is_a_file_name() {
        let mut config = KeelConfig::default();
        config.paths.manifest_file_name = "nested/manifest.toml".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
