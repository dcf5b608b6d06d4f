//! Request envelopes, the upstream call result and the client-facing response.

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::relay::error::{RelayError, RelayResult};

/// The operation a caller asked for. Picks the matching handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TokenExchange,
    Resource,
    License,
}

impl Operation {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::TokenExchange => "token_exchange",
            Operation::Resource => "resource",
            Operation::License => "license",
        }
    }
}

/// Body of a token exchange call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    pub store_domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Body of an Admin API resource fetch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub store_domain: Option<String>,
    pub access_token: Option<String>,
    pub path: Option<String>,
    /// Forwarded as query parameters; `null` entries are dropped.
    pub params: Option<Map<String, Value>>,
}

/// Body of a license check.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRequest {
    pub license_key: Option<String>,
}

/// Caller-supplied envelope, one variant per operation.
#[derive(Debug, Clone)]
pub enum ProxyRequest {
    TokenExchange(TokenExchangeRequest),
    Resource(ResourceRequest),
    License(LicenseRequest),
}

impl ProxyRequest {
    /// Decode a raw JSON body for `operation`.
    ///
    /// An empty body decodes to an envelope with every field missing, so the
    /// handler reports the missing fields instead of a parse error.
    pub fn parse(operation: Operation, body: &[u8]) -> RelayResult<Self> {
        let request = match operation {
            Operation::TokenExchange => ProxyRequest::TokenExchange(decode(body)?),
            Operation::Resource => ProxyRequest::Resource(decode(body)?),
            Operation::License => ProxyRequest::License(decode(body)?),
        };
        Ok(request)
    }

    pub fn operation(&self) -> Operation {
        match self {
            ProxyRequest::TokenExchange(_) => Operation::TokenExchange,
            ProxyRequest::Resource(_) => Operation::Resource,
            ProxyRequest::License(_) => Operation::License,
        }
    }
}

fn decode<T>(body: &[u8]) -> RelayResult<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| RelayError::InvalidBody(e.to_string()))
}

/// Returns the field value when it is present and non-empty.
pub(crate) fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Status, body and headers of the one outbound call made per request.
#[derive(Debug, Clone)]
pub struct UpstreamCallResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamCallResult {
    /// Header value by case-insensitive name. Repeated headers are joined
    /// with `", "`; values that are not valid UTF-8 are skipped.
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }

    /// Body as text, lossy on invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> RelayResult<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Client-facing response: a status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
