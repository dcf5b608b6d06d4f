//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, overlay env secrets)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to every handler
//! ```
//!
//! # Design Decisions
//! - Config is loaded once and never mutated
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment, never from the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{CorsConfig, LicenseConfig, ListenerConfig, ObservabilityConfig, RelayConfig, UpstreamConfig};
