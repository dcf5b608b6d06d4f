//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides the listener port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay environment and validate configuration.
///
/// Without a path, defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RelayConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay values held in the environment.
///
/// The license API key only ever comes from the environment. `PORT` replaces
/// the port of the configured bind address.
pub fn apply_env<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(&config.license.api_key_env).filter(|k| !k.is_empty()) {
        config.license.api_key = Some(key);
    }

    if let Some(port) = lookup(PORT_ENV).filter(|p| !p.is_empty()) {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }
}
