//! Request-proxying core.
//!
//! # Data Flow
//! ```text
//! inbound JSON body
//!     → types.rs (decode ProxyRequest for the operation)
//!     → token.rs | admin_api.rs | license.rs (validate required fields)
//!     → domain.rs (normalize store domain)
//!     → upstream.rs (exactly one outbound call)
//!     → profile.rs (map upstream status to client status + label)
//!     → ProxyResponse { status, json body }
//! ```
//!
//! # Design Decisions
//! - Every call is independent: no token cache, no retries, no shared state
//! - Configuration is immutable and injected, never read from globals
//! - Client input errors are answered before any network call

pub mod admin_api;
pub mod domain;
pub mod error;
pub mod license;
pub mod profile;
pub mod token;
pub mod types;
pub mod upstream;

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use serde_json::json;

use crate::config::RelayConfig;
use crate::observability::metrics;

pub use domain::NormalizedDomain;
pub use error::{RelayError, RelayResult, UpstreamError};
pub use types::{
    LicenseRequest, Operation, ProxyRequest, ProxyResponse, ResourceRequest, TokenExchangeRequest,
    UpstreamCallResult,
};
pub use upstream::{HttpUpstream, Upstream, UpstreamBody, UpstreamRequest};

/// Handler set bound to one configuration and one outbound client.
#[derive(Clone)]
pub struct Relay {
    config: Arc<RelayConfig>,
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(config: Arc<RelayConfig>, upstream: Arc<dyn Upstream>) -> Self {
        Self { config, upstream }
    }

    /// Build a relay backed by a `reqwest` client configured from `config`.
    pub fn from_config(config: Arc<RelayConfig>) -> Result<Self, reqwest::Error> {
        let upstream = HttpUpstream::new(&config.upstream)?;
        Ok(Self::new(config, Arc::new(upstream)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Dispatch a decoded request to its handler.
    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
        let operation = request.operation();
        let start = Instant::now();
        let upstream = self.upstream.as_ref();

        let response = match &request {
            ProxyRequest::TokenExchange(req) => token::exchange_token(&self.config.upstream, upstream, req).await,
            ProxyRequest::Resource(req) => admin_api::fetch_resource(&self.config.upstream, upstream, req).await,
            ProxyRequest::License(req) => license::validate_license(&self.config.license, upstream, req).await,
        };

        metrics::record_request(operation.as_str(), response.status.as_u16(), start);
        response
    }

    /// Decode a raw body for `operation` and dispatch it.
    pub async fn handle_body(&self, operation: Operation, body: &[u8]) -> ProxyResponse {
        match ProxyRequest::parse(operation, body) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!(operation = operation.as_str(), error = %e, "Rejected request body");
                metrics::record_request(operation.as_str(), StatusCode::BAD_REQUEST.as_u16(), Instant::now());
                invalid_body(operation, &e)
            }
        }
    }
}

fn invalid_body(operation: Operation, error: &RelayError) -> ProxyResponse {
    match operation {
        Operation::License => license::rejected(error),
        Operation::TokenExchange | Operation::Resource => {
            ProxyResponse::new(error.status(), json!({ "error": error.to_string() }))
        }
    }
}
