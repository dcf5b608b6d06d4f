//! Shared forwarding path for the Admin API handlers.
//!
//! Token exchange and resource fetch differ only in the required fields, the
//! status label table and the diagnostic context they attach to failures.
//! Both run through [`forward`].

use std::time::Instant;

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use crate::observability::metrics;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::types::{Operation, ProxyResponse, UpstreamCallResult};
use crate::relay::upstream::{Upstream, UpstreamRequest};

/// Maps an upstream failure status to a human-readable label.
#[derive(Debug, Clone, Copy)]
pub struct StatusLabels {
    specific: &'static [(u16, &'static str)],
    fallback: &'static str,
}

impl StatusLabels {
    pub const fn new(specific: &'static [(u16, &'static str)], fallback: &'static str) -> Self {
        Self { specific, fallback }
    }

    /// Fixed label for `status`, if the table names it.
    pub fn specific(&self, status: StatusCode) -> Option<&'static str> {
        self.specific
            .iter()
            .find(|(code, _)| *code == status.as_u16())
            .map(|(_, label)| *label)
    }

    /// Fixed label, or `"{fallback}: {status}"`.
    pub fn label(&self, status: StatusCode) -> String {
        match self.specific(status) {
            Some(label) => label.to_string(),
            None => format!("{}: {}", self.fallback, status.as_u16()),
        }
    }
}

/// Where diagnostic context is attached on upstream rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    /// On every failure body.
    Always,
    /// Only when the status fell through to the generic label.
    FallbackOnly,
}

/// Everything that varies between the Admin API handlers.
#[derive(Debug, Clone, Copy)]
pub struct ForwardProfile {
    pub operation: Operation,
    /// Field names in the order they are reported.
    pub required: &'static [&'static str],
    pub labels: StatusLabels,
    pub context: ContextPolicy,
    /// `error` value on transport or decode failure.
    pub transport_error: &'static str,
}

impl ForwardProfile {
    /// Body for a request that is missing required fields.
    pub fn missing_fields(&self) -> ProxyResponse {
        ProxyResponse::new(
            StatusCode::BAD_REQUEST,
            json!({ "error": format!("Missing required fields: {}", self.required.join(", ")) }),
        )
    }

    /// Body for an upstream non-2xx, with the upstream status preserved.
    pub fn rejection(&self, result: &UpstreamCallResult, context: &[(&'static str, &str)]) -> ProxyResponse {
        let specific = self.labels.specific(result.status).is_some();
        let mut body = Map::new();
        body.insert("error".into(), Value::String(self.labels.label(result.status)));
        body.insert("details".into(), Value::String(result.text()));
        if self.context == ContextPolicy::Always || !specific {
            for (key, value) in context {
                body.insert((*key).to_string(), Value::String((*value).to_string()));
            }
        }
        ProxyResponse::new(result.status, Value::Object(body))
    }

    /// Body for a transport, URL or decode failure.
    pub fn failure(&self, message: impl std::fmt::Display) -> ProxyResponse {
        ProxyResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": self.transport_error, "message": message.to_string() }),
        )
    }
}

/// Perform the single outbound call and map its outcome.
///
/// `on_success` shapes a 2xx result into the client body. Any error it
/// returns is reported like a transport failure.
pub async fn forward<F>(
    profile: &ForwardProfile,
    upstream: &dyn Upstream,
    request: UpstreamRequest,
    context: &[(&'static str, &str)],
    on_success: F,
) -> ProxyResponse
where
    F: FnOnce(UpstreamCallResult) -> RelayResult<Value>,
{
    let operation = profile.operation.as_str();
    let start = Instant::now();

    let result = match upstream.send(request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(operation, error = %e, "Upstream call failed");
            metrics::record_upstream(operation, None, start);
            return profile.failure(RelayError::from(e));
        }
    };
    metrics::record_upstream(operation, Some(result.status), start);

    if !result.status.is_success() {
        let text = result.text();
        tracing::error!(
            operation,
            status = result.status.as_u16(),
            context = ?context,
            response = %truncate(&text, 500),
            "Upstream rejected request"
        );
        return profile.rejection(&result, context);
    }

    let status = result.status;
    match on_success(result) {
        Ok(body) => {
            tracing::info!(operation, status = status.as_u16(), "Upstream call succeeded");
            ProxyResponse::ok(body)
        }
        Err(e) => {
            tracing::error!(operation, error = %e, "Failed to shape upstream response");
            profile.failure(e)
        }
    }
}

/// At most `max` characters of `text`.
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::HeaderMap;

    const LABELS: StatusLabels = StatusLabels::new(&[(401, "Nope"), (403, "Forbidden here")], "Thing failed");

    fn profile(context: ContextPolicy) -> ForwardProfile {
        ForwardProfile {
            operation: Operation::Resource,
            required: &["a", "b"],
            labels: LABELS,
            context,
            transport_error: "Thing request failed",
        }
    }

    fn result(status: u16, body: &'static str) -> UpstreamCallResult {
        UpstreamCallResult {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(LABELS.label(StatusCode::UNAUTHORIZED), "Nope");
        assert_eq!(LABELS.label(StatusCode::FORBIDDEN), "Forbidden here");
        assert_eq!(LABELS.label(StatusCode::BAD_GATEWAY), "Thing failed: 502");
        assert!(LABELS.specific(StatusCode::NOT_FOUND).is_none());
    }

    #[test]
    fn test_missing_fields_lists_required() {
        let response = profile(ContextPolicy::Always).missing_fields();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "Missing required fields: a, b");
    }

    #[test]
    fn test_rejection_context_policy() {
        let context = [("domain", "shop.example")];

        let always = profile(ContextPolicy::Always).rejection(&result(401, "bad"), &context);
        assert_eq!(always.status, StatusCode::UNAUTHORIZED);
        assert_eq!(always.body["details"], "bad");
        assert_eq!(always.body["domain"], "shop.example");

        let fallback_only = profile(ContextPolicy::FallbackOnly);
        let specific = fallback_only.rejection(&result(401, "bad"), &context);
        assert!(specific.body.get("domain").is_none());
        let generic = fallback_only.rejection(&result(429, "slow down"), &context);
        assert_eq!(generic.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(generic.body["error"], "Thing failed: 429");
        assert_eq!(generic.body["domain"], "shop.example");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
