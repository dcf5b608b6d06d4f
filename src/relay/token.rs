//! OAuth client-credentials token exchange.
//!
//! Trades a merchant app's client id/secret for an Admin API access token.
//! The token is relayed to the caller and never stored.

use axum::http::{header, HeaderValue, Method};
use url::Url;

use crate::config::UpstreamConfig;
use crate::relay::domain::NormalizedDomain;
use crate::relay::error::RelayError;
use crate::relay::profile::{forward, ContextPolicy, ForwardProfile, StatusLabels};
use crate::relay::types::{required, Operation, ProxyResponse, TokenExchangeRequest};
use crate::relay::upstream::{Upstream, UpstreamBody, UpstreamRequest};

pub const TOKEN_EXCHANGE: ForwardProfile = ForwardProfile {
    operation: Operation::TokenExchange,
    required: &["storeDomain", "clientId", "clientSecret"],
    labels: StatusLabels::new(
        &[
            (400, "Invalid Client ID or Secret"),
            (401, "Authentication failed"),
            (403, "App not installed on this store"),
        ],
        "Token request failed",
    ),
    context: ContextPolicy::FallbackOnly,
    transport_error: "Token request failed",
};

/// `{scheme}://{domain}/admin/oauth/access_token`
pub fn token_url(scheme: &str, domain: &NormalizedDomain) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{scheme}://{domain}/admin/oauth/access_token"))
}

/// Exchange client credentials for an access token.
pub async fn exchange_token(
    config: &UpstreamConfig,
    upstream: &dyn Upstream,
    request: &TokenExchangeRequest,
) -> ProxyResponse {
    let profile = &TOKEN_EXCHANGE;
    let (Some(store_domain), Some(client_id), Some(client_secret)) = (
        required(&request.store_domain),
        required(&request.client_id),
        required(&request.client_secret),
    ) else {
        tracing::warn!(
            store_domain = request.store_domain.is_some(),
            client_id = request.client_id.is_some(),
            client_secret = request.client_secret.is_some(),
            "Token exchange missing fields"
        );
        return profile.missing_fields();
    };

    let domain = NormalizedDomain::normalize(store_domain);
    let url = match token_url(&config.scheme, &domain) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(domain = %domain, error = %e, "Invalid token URL");
            return profile.failure(RelayError::from(e));
        }
    };

    tracing::info!(domain = %domain, "Requesting access token");

    let mut outbound = UpstreamRequest::new(Method::POST, url).with_body(UpstreamBody::Form(vec![
        ("grant_type", "client_credentials".to_string()),
        ("client_id", client_id.to_string()),
        ("client_secret", client_secret.to_string()),
    ]));
    outbound.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );

    forward(
        profile,
        upstream,
        outbound,
        &[("domain", domain.as_str())],
        |result| result.json(),
    )
    .await
}
