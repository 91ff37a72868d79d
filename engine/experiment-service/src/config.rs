//! Service configuration management

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use experiment::ExperimentConfig;
use persistence::PersistenceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix; nested keys use `__`, e.g. `CARBON_LOGGING__LEVEL=debug`
pub const ENV_PREFIX: &str = "CARBON";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service-level settings
    pub service: ServiceSettings,

    /// Experiment parameters
    pub experiment: ExperimentConfig,

    /// Persistence configuration
    pub persistence: PersistenceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Name of the experiment run; part of every group key
    pub experiment_name: String,

    /// Seed for round setup draws (cost coefficients, caps, payout round).
    /// Unset draws from entropy.
    pub seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { experiment_name: "carbon".to_string(), seed: None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Load configuration from an optional TOML file, then `CARBON_*` environment variables
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__").try_parsing(true),
    );

    let config: ServiceConfig = builder
        .build()
        .context("Failed to read configuration sources")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    if config.service.experiment_name.trim().is_empty() {
        return Err(anyhow::anyhow!("experiment_name must not be empty"));
    }

    config.experiment.validate().context("Invalid experiment configuration")?;
    config.persistence.validate().map_err(anyhow::Error::msg).context("Invalid persistence configuration")?;

    // Validate log level
    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", config.logging.level)),
    }

    // Validate log format
    match config.logging.format.as_str() {
        "json" | "pretty" | "compact" => {}
        _ => return Err(anyhow::anyhow!("Invalid log format: {}", config.logging.format)),
    }

    Ok(())
}

/// Save configuration to a TOML file
pub fn save_config(config: &ServiceConfig, path: &Path) -> Result<()> {
    let text = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, text).with_context(|| format!("Failed to write configuration to {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::StoreBackend;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.service.experiment_name, "carbon");
        assert_eq!(config.persistence.backend, StoreBackend::Memory);
    }

    #[test]
    fn saved_defaults_load_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carbon.toml");
        save_config(&ServiceConfig::default(), &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.experiment.general.players_per_group, 15);
        assert_eq!(loaded.experiment.general.disturbance_range, (-1.0, 1.0));
        assert_eq!(loaded.experiment.muda.item_price_options, vec![25, 30, 35, 40]);
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            r#"
[service]
experiment_name = "pilot"
seed = 7

[experiment.general]
players_per_group = 4

[logging]
format = "json"
"#,
        )
        .unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.service.experiment_name, "pilot");
        assert_eq!(loaded.service.seed, Some(7));
        assert_eq!(loaded.experiment.general.players_per_group, 4);
        assert_eq!(loaded.experiment.general.num_rounds, 15);
        assert_eq!(loaded.logging.format, "json");
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = ServiceConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = ServiceConfig::default();
        config.experiment.general.players_per_group = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
