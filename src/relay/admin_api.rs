//! Authenticated Admin API reads.
//!
//! # Responsibilities
//! - Build `/admin/api/{version}{path}` on the merchant's store
//! - Forward caller params as query parameters, dropping `null`s
//! - Inject the caller's access token header
//! - Relay pagination (`link`) and rate-limit metadata unparsed

use axum::http::{header, HeaderName, HeaderValue, Method};
use serde_json::{json, Map, Value};
use url::Url;

use crate::config::UpstreamConfig;
use crate::relay::domain::NormalizedDomain;
use crate::relay::error::RelayError;
use crate::relay::profile::{forward, ContextPolicy, ForwardProfile, StatusLabels};
use crate::relay::types::{required, Operation, ProxyResponse, ResourceRequest};
use crate::relay::upstream::{Upstream, UpstreamRequest};

pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-shopify-access-token");
pub const CALL_LIMIT_HEADER: &str = "x-shopify-shop-api-call-limit";

pub const RESOURCE_FETCH: ForwardProfile = ForwardProfile {
    operation: Operation::Resource,
    required: &["storeDomain", "accessToken", "path"],
    labels: StatusLabels::new(
        &[
            (401, "Access token invalid or expired"),
            (403, "Insufficient permissions"),
        ],
        "Shopify API error",
    ),
    context: ContextPolicy::Always,
    transport_error: "API request failed",
};

/// Build the versioned resource URL and apply `params` to its query.
///
/// `params` use set semantics: a key already present in `path`'s query string
/// is replaced, not duplicated.
pub fn resource_url(
    scheme: &str,
    domain: &NormalizedDomain,
    api_version: &str,
    path: &str,
    params: Option<&Map<String, Value>>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{scheme}://{domain}/admin/api/{api_version}{path}"))?;
    for (key, value) in params.into_iter().flatten() {
        if let Some(value) = query_value(value) {
            set_query_param(&mut url, key, &value);
        }
    }
    Ok(url)
}

/// Stringify a param value, or `None` when it must be omitted.
pub fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| query_value(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in url.query_pairs() {
        if k == key {
            if !replaced {
                pairs.push((key.to_string(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }
    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }
    url.query_pairs_mut().clear().extend_pairs(pairs);
}

/// Forward an authenticated GET to the Admin API.
pub async fn fetch_resource(
    config: &UpstreamConfig,
    upstream: &dyn Upstream,
    request: &ResourceRequest,
) -> ProxyResponse {
    let profile = &RESOURCE_FETCH;
    let (Some(store_domain), Some(access_token), Some(path)) = (
        required(&request.store_domain),
        required(&request.access_token),
        required(&request.path),
    ) else {
        tracing::warn!(
            store_domain = request.store_domain.is_some(),
            access_token = request.access_token.is_some(),
            path = request.path.is_some(),
            "Resource fetch missing fields"
        );
        return profile.missing_fields();
    };

    let domain = NormalizedDomain::normalize(store_domain);
    let url = match resource_url(
        &config.scheme,
        &domain,
        &config.admin_api_version,
        path,
        request.params.as_ref(),
    ) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(domain = %domain, path, error = %e, "Invalid resource URL");
            return profile.failure(RelayError::from(e));
        }
    };
    let token = match HeaderValue::from_str(access_token) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(domain = %domain, path, "Access token is not a valid header value");
            return profile.failure(e);
        }
    };

    tracing::info!(domain = %domain, path, "GET Admin API resource");

    let mut outbound = UpstreamRequest::new(Method::GET, url);
    outbound
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    outbound.headers.insert(ACCESS_TOKEN_HEADER, token);

    let context = [("path", path), ("domain", domain.as_str())];
    forward(profile, upstream, outbound, &context, |result| {
        let data = result.json()?;
        let call_limit = result.header(CALL_LIMIT_HEADER);
        tracing::debug!(path, call_limit = call_limit.as_deref().unwrap_or("N/A"), "Admin API call limit");
        Ok(json!({
            "data": data,
            "link": result.header("link"),
            "callLimit": call_limit,
        }))
    })
    .await
}
