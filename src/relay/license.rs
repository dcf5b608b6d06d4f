//! License-key validation against the vendor API.
//!
//! Once a key is present and the server credential is configured, the
//! response status is always 200. Upstream transport failures, non-2xx answers
//! and `valid:false` all come back as `isValid: false`, with `error`
//! describing the cause when one is known.

use std::time::Instant;

use axum::http::{header, HeaderValue, Method};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::LicenseConfig;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::types::{required, LicenseRequest, Operation, ProxyResponse};
use crate::relay::upstream::{Upstream, UpstreamBody, UpstreamRequest};

const KEY_LOG_PREFIX: usize = 8;
const NOT_CONFIGURED: &str = "License validation not configured";

/// Non-fail-soft answer for requests that never reach the vendor API.
pub(crate) fn rejected(error: &RelayError) -> ProxyResponse {
    ProxyResponse::new(
        error.status(),
        json!({ "error": error.to_string(), "isValid": false }),
    )
}

/// Client-facing verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LicenseVerdict {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `Some(Value::Null)` still serializes, so success bodies always carry it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl LicenseVerdict {
    /// Fail-soft verdict carrying only an error.
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Verdict from a 2xx upstream body.
    pub fn from_upstream(data: &Value) -> Self {
        let is_valid = data.get("valid") == Some(&Value::Bool(true));
        Self {
            is_valid,
            error: if is_valid { None } else { error_message(data) },
            license_key: Some(truthy(data.get("license_key")).unwrap_or(Value::Null)),
            customer: truthy(data.get("customer")),
            expires_at: truthy(data.get("expires_at")),
            meta: truthy(data.get("meta")),
        }
    }

    fn into_proxy_response(self) -> ProxyResponse {
        let body = serde_json::to_value(&self).unwrap_or_else(|_| json!({ "isValid": false }));
        ProxyResponse::ok(body)
    }
}

/// The value, unless absent or JSON-falsy (`null`, `false`, `0`, `""`).
fn truthy(value: Option<&Value>) -> Option<Value> {
    let value = value?;
    let falsy = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    };
    (!falsy).then(|| value.clone())
}

fn error_message(data: &Value) -> Option<String> {
    data.get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn key_prefix(key: &str) -> &str {
    crate::relay::profile::truncate(key, KEY_LOG_PREFIX)
}

/// Validate a license key.
pub async fn validate_license(
    config: &LicenseConfig,
    upstream: &dyn Upstream,
    request: &LicenseRequest,
) -> ProxyResponse {
    let Some(license_key) = required(&request.license_key) else {
        return rejected(&RelayError::MissingFields("Missing license key"));
    };

    let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) else {
        tracing::warn!(env = %config.api_key_env, "License API key not configured");
        return rejected(&RelayError::NotConfigured(NOT_CONFIGURED));
    };

    let prefix = key_prefix(license_key);
    tracing::info!(key = %prefix, "Validating license");

    let url = match Url::parse(&config.validate_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(url = %config.validate_url, error = %e, "Invalid license validation URL");
            return LicenseVerdict::invalid(e.to_string()).into_proxy_response();
        }
    };

    let mut outbound = UpstreamRequest::new(Method::POST, url)
        .with_body(UpstreamBody::Json(json!({ "license_key": license_key })));
    outbound
        .headers
        .insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    if config.bearer_auth {
        match HeaderValue::from_str(&format!("Bearer {api_key}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                outbound.headers.insert(header::AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::error!("License API key is not a valid header value");
                return LicenseVerdict::invalid(NOT_CONFIGURED).into_proxy_response();
            }
        }
    }

    let start = Instant::now();
    let result = match upstream.send(outbound).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(key = %prefix, error = %e, "License validation error");
            metrics::record_upstream(Operation::License.as_str(), None, start);
            return LicenseVerdict::invalid(e.to_string()).into_proxy_response();
        }
    };
    metrics::record_upstream(Operation::License.as_str(), Some(result.status), start);

    let data = match result.json() {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(key = %prefix, status = result.status.as_u16(), error = %e, "License response not JSON");
            return LicenseVerdict::invalid(e.to_string()).into_proxy_response();
        }
    };

    if !result.status.is_success() {
        let error = error_message(&data).unwrap_or_else(|| "Invalid license key".to_string());
        tracing::error!(key = %prefix, status = result.status.as_u16(), error = %error, "License validation failed");
        return LicenseVerdict::invalid(error).into_proxy_response();
    }

    let verdict = LicenseVerdict::from_upstream(&data);
    if verdict.is_valid {
        tracing::info!(key = %prefix, "License valid");
    } else {
        tracing::info!(key = %prefix, "License invalid");
    }
    verdict.into_proxy_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::upstream::testing::RecordingUpstream;
    use axum::http::StatusCode;

    fn configured() -> LicenseConfig {
        LicenseConfig {
            api_key: Some("ls_secret".into()),
            ..LicenseConfig::default()
        }
    }

    fn request(key: &str) -> LicenseRequest {
        LicenseRequest {
            license_key: Some(key.into()),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_400_without_call() {
        let upstream = RecordingUpstream::new();
        for case in [LicenseRequest::default(), request("")] {
            let response = validate_license(&configured(), &upstream, &case).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST);
            assert_eq!(response.body, json!({ "error": "Missing license key", "isValid": false }));
        }
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_credential_is_500_without_call() {
        let upstream = RecordingUpstream::new();
        let response = validate_license(&LicenseConfig::default(), &upstream, &request("ABCDEFGH-1234")).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body,
            json!({ "error": "License validation not configured", "isValid": false })
        );
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_valid_license_passes_optional_fields() {
        let upstream = RecordingUpstream::new().respond_json(
            200,
            json!({
                "valid": true,
                "license_key": { "key": "ABCDEFGH-1234", "status": "active" },
                "customer": { "name": "Ada" },
                "expires_at": "2027-01-01T00:00:00Z",
            }),
        );
        let response = validate_license(&configured(), &upstream, &request("ABCDEFGH-1234")).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.body,
            json!({
                "isValid": true,
                "license_key": { "key": "ABCDEFGH-1234", "status": "active" },
                "customer": { "name": "Ada" },
                "expires_at": "2027-01-01T00:00:00Z",
            })
        );

        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].url.as_str(), LicenseConfig::default().validate_url);
        assert_eq!(calls[0].headers.get(header::AUTHORIZATION).unwrap(), "Bearer ls_secret");
        assert_eq!(calls[0].body, UpstreamBody::Json(json!({ "license_key": "ABCDEFGH-1234" })));
    }

    #[tokio::test]
    async fn test_optional_fields_omitted_when_absent() {
        let upstream = RecordingUpstream::new().respond_json(200, json!({ "valid": true }));
        let response = validate_license(&configured(), &upstream, &request("k")).await;
        assert_eq!(response.body, json!({ "isValid": true, "license_key": null }));
    }

    #[tokio::test]
    async fn test_explicit_invalid_is_200() {
        let upstream = RecordingUpstream::new()
            .respond_json(200, json!({ "valid": false, "error": "license_key not found." }));
        let response = validate_license(&configured(), &upstream, &request("k")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["isValid"], false);
        assert_eq!(response.body["error"], "license_key not found.");
    }

    #[tokio::test]
    async fn test_upstream_failures_fold_into_200() {
        let cases = [
            RecordingUpstream::new().respond_json(500, json!({ "error": "boom" })),
            RecordingUpstream::new().respond_json(404, json!({})),
            RecordingUpstream::new().respond(502, &[], "<html>bad gateway</html>"),
            RecordingUpstream::new().respond(200, &[], "not json"),
            RecordingUpstream::new().fail(),
        ];
        for upstream in cases {
            let response = validate_license(&configured(), &upstream, &request("k")).await;
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body["isValid"], false);
            assert!(response.body["error"].is_string());
            assert_eq!(upstream.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_non_2xx_error_label() {
        let upstream = RecordingUpstream::new().respond_json(500, json!({ "error": "boom" }));
        let response = validate_license(&configured(), &upstream, &request("k")).await;
        assert_eq!(response.body, json!({ "isValid": false, "error": "boom" }));

        let upstream = RecordingUpstream::new().respond_json(422, json!({ "message": "nope" }));
        let response = validate_license(&configured(), &upstream, &request("k")).await;
        assert_eq!(response.body, json!({ "isValid": false, "error": "Invalid license key" }));
    }

    #[tokio::test]
    async fn test_unauthenticated_variant_sends_no_bearer() {
        let upstream = RecordingUpstream::new().respond_json(200, json!({ "valid": true }));
        let config = LicenseConfig {
            bearer_auth: false,
            ..configured()
        };
        validate_license(&config, &upstream, &request("k")).await;
        assert!(upstream.calls()[0].headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_key_prefix() {
        assert_eq!(key_prefix("ABCDEFGH-1234-5678"), "ABCDEFGH");
        assert_eq!(key_prefix("abc"), "abc");
    }
}
