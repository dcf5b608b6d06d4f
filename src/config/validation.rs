//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URL scheme and the API version literal
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a loaded configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }

    if !matches!(config.upstream.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "upstream.scheme",
            format!("'{}' must be http or https", config.upstream.scheme),
        ));
    }
    if !is_api_version(&config.upstream.admin_api_version) {
        errors.push(ValidationError::new(
            "upstream.admin_api_version",
            format!("'{}' is not a YYYY-MM version", config.upstream.admin_api_version),
        ));
    }
    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if let Err(e) = url::Url::parse(&config.license.validate_url) {
        errors.push(ValidationError::new("license.validate_url", e.to_string()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `YYYY-MM`, or the platform's `unstable` channel.
fn is_api_version(version: &str) -> bool {
    if version == "unstable" {
        return true;
    }
    let bytes = version.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.upstream.scheme = "ftp".into();
        config.upstream.admin_api_version = "v1".into();
        config.license.validate_url = "not a url".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "upstream.scheme",
                "upstream.admin_api_version",
                "license.validate_url",
            ]
        );
    }

    #[test]
    fn test_api_versions() {
        assert!(is_api_version("2026-01"));
        assert!(is_api_version("2023-10"));
        assert!(is_api_version("unstable"));
        assert!(!is_api_version("2026-1"));
        assert!(!is_api_version("2026/01"));
        assert!(!is_api_version(""));
    }
}
