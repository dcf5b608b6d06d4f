//! Credential-hiding relay between a browser design-tool plugin and the
//! commerce platform's Admin API and license-validation service.

pub mod config;
pub mod http;
pub mod observability;
pub mod relay;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use relay::Relay;
