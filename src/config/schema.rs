//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Commerce platform Admin API settings.
    pub upstream: UpstreamConfig,

    /// License validation service settings.
    pub license: LicenseConfig,

    /// Cross-origin settings for the browser plugin.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Outbound Admin API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// URL scheme for store domains. Only `http` for local test doubles.
    pub scheme: String,

    /// Admin API version embedded in resource paths (e.g. "2026-01").
    pub admin_api_version: String,

    /// Overall outbound timeout. `None` keeps the client default.
    pub timeout_secs: Option<u64>,

    /// User-Agent for outbound calls.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            admin_api_version: "2026-01".to_string(),
            timeout_secs: None,
            user_agent: concat!("storefront-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// License validation service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Validation endpoint. The default is the authenticated
    /// `/v1/license-keys/validate` route, paired with `bearer_auth = true`.
    /// The public `/v1/licenses/validate` route takes no credential; set
    /// `bearer_auth = false` when using it.
    pub validate_url: String,

    /// Send `Authorization: Bearer <api_key>` with each validation.
    pub bearer_auth: bool,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// API key. Only ever read from `api_key_env` at load time.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            validate_url: "https://api.lemonsqueezy.com/v1/license-keys/validate".to_string(),
            bearer_auth: true,
            api_key_env: "LEMON_SQUEEZY_API_KEY".to_string(),
            api_key: None,
        }
    }
}

/// CORS settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Pre-flight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_secs: 86_400,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3001");
        assert_eq!(config.upstream.scheme, "https");
        assert_eq!(config.upstream.admin_api_version, "2026-01");
        assert!(config.upstream.timeout_secs.is_none());
        assert!(config.license.bearer_auth);
        assert!(config.license.validate_url.ends_with("/v1/license-keys/validate"));
        assert!(config.license.api_key.is_none());
        assert_eq!(config.cors.allowed_origins, vec!["*"]);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [upstream]
            admin_api_version = "2023-10"

            [license]
            bearer_auth = false
            "#,
        )
        .unwrap();
        assert_eq!(config.upstream.admin_api_version, "2023-10");
        assert_eq!(config.upstream.scheme, "https");
        assert!(!config.license.bearer_auth);
        assert_eq!(config.license.api_key_env, "LEMON_SQUEEZY_API_KEY");
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = RelayConfig::default();
        config.license.api_key = Some("ls_secret".into());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("ls_secret"));
    }
}
