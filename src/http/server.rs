//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay endpoints
//! - Wire up middleware (tracing, request ID, CORS, body limit, headers)
//! - Bind server to listener
//! - Shut down gracefully on Ctrl+C or a caller-supplied signal

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::{CorsConfig, RelayConfig};
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::relay::Relay;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
}

impl HttpServer {
    /// Create a server whose relay talks to the real upstreams.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let relay = Relay::from_config(Arc::new(config))?;
        Ok(Self::with_relay(relay))
    }

    /// Create a server around an existing relay.
    pub fn with_relay(relay: Relay) -> Self {
        let config = Arc::new(relay.config().clone());
        let router = Self::build_router(&config, AppState { relay });
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        Router::new()
            .route(
                "/api/shopify-proxy",
                post(handlers::token_exchange)
                    .options(handlers::preflight)
                    .fallback(handlers::method_not_allowed),
            )
            .route(
                "/api/shopify-request",
                post(handlers::resource_fetch)
                    .options(handlers::preflight)
                    .fallback(handlers::method_not_allowed),
            )
            .route(
                "/api/validate-license",
                post(handlers::validate_license)
                    .options(handlers::preflight)
                    .fallback(handlers::method_not_allowed),
            )
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(cors_layer(&config.cors))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin_api_version = %self.config.upstream.admin_api_version,
            license_configured = self.config.license.api_key.is_some(),
            "HTTP server starting"
        );
        tracing::info!("POST /api/shopify-proxy    - token exchange");
        tracing::info!("POST /api/shopify-request  - Admin API proxy");
        tracing::info!("POST /api/validate-license - license validation");
        tracing::info!("GET  /health               - health check");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(config.max_age_secs))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
