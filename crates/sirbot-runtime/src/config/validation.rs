//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CoreConfig, LogOutput, LoggingConfig, SirBotConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SirBotConfig) -> ConfigResult<()> {
    validate_core_config(&config.core)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_core_config(core: &CoreConfig) -> ConfigResult<()> {
    if core.host.trim().is_empty() {
        return Err(ConfigError::missing_field("core.host"));
    }

    // Port 0 binds an ephemeral port; repeated plugin identifiers import once.
    if core.plugins.iter().any(|path| path.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Plugin identifiers in core.plugins cannot be empty",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&SirBotConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_accepts_ephemeral_port() {
        let mut config = SirBotConfig::default();
        config.core.port = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_accepts_repeated_plugin() {
        let mut config = SirBotConfig::default();
        config.core.plugins = vec!["a".into(), "b".into(), "a".into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_entries() {
        let mut config = SirBotConfig::default();
        config.core.plugins = vec!["a".into(), " ".into()];
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = SirBotConfig::default();
        config.core.host = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { ref field }) if field == "core.host"
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = SirBotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
        config.logging.file_path = Some("sirbot.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
