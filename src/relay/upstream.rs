//! Outbound HTTP seam.
//!
//! # Responsibilities
//! - Describe the single outbound call a handler wants to make
//! - Execute it with a shared `reqwest` client
//! - Return status, headers and the fully buffered body
//!
//! # Design Decisions
//! - One call per inbound request: no retry, no cache
//! - Timeout is the client default unless `upstream.timeout_secs` is set
//! - Handlers depend on the `Upstream` trait so tests can count calls

use std::time::Duration;

use axum::http::{HeaderMap, Method};
use futures_util::future::BoxFuture;
use serde_json::Value;
use url::Url;

use crate::config::UpstreamConfig;
use crate::relay::error::UpstreamError;
use crate::relay::types::UpstreamCallResult;

/// Outbound request body.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Empty,
    /// `application/x-www-form-urlencoded`.
    Form(Vec<(&'static str, String)>),
    /// `application/json`.
    Json(Value),
}

/// A fully described outbound call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

impl UpstreamRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: UpstreamBody::Empty,
        }
    }

    pub fn with_body(mut self, body: UpstreamBody) -> Self {
        self.body = body;
        self
    }
}

/// Performs outbound calls on behalf of the handlers.
pub trait Upstream: Send + Sync {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamCallResult, UpstreamError>>;
}

/// `reqwest`-backed upstream used in production.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Build the shared client from configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Upstream for HttpUpstream {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamCallResult, UpstreamError>> {
        Box::pin(async move {
            let builder = self
                .client
                .request(request.method, request.url)
                .headers(request.headers);
            let builder = match request.body {
                UpstreamBody::Empty => builder,
                UpstreamBody::Form(pairs) => builder.form(&pairs),
                UpstreamBody::Json(value) => builder.json(&value),
            };

            let response = builder.send().await.map_err(UpstreamError::Request)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(UpstreamError::Body)?;

            Ok(UpstreamCallResult {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording test double.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use axum::body::Bytes;
    use axum::http::{HeaderValue, StatusCode};

    use super::*;

    enum Scripted {
        Respond(UpstreamCallResult),
        Fail,
    }

    /// Replays scripted results and records every request it receives.
    #[derive(Default)]
    pub struct RecordingUpstream {
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<UpstreamRequest>>,
    }

    impl RecordingUpstream {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response with a JSON body.
        pub fn respond_json(self, status: u16, body: Value) -> Self {
            self.respond(status, &[], body.to_string())
        }

        /// Queue a response with raw body text and extra headers.
        pub fn respond(self, status: u16, headers: &[(&'static str, &'static str)], body: impl Into<String>) -> Self {
            let mut map = HeaderMap::new();
            for (name, value) in headers {
                map.insert(*name, HeaderValue::from_static(*value));
            }
            let result = UpstreamCallResult {
                status: StatusCode::from_u16(status).unwrap(),
                headers: map,
                body: Bytes::from(body.into()),
            };
            self.script.lock().unwrap().push_back(Scripted::Respond(result));
            self
        }

        /// Queue a transport-level failure.
        pub fn fail(self) -> Self {
            self.script.lock().unwrap().push_back(Scripted::Fail);
            self
        }

        pub fn calls(&self) -> Vec<UpstreamRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    fn transport_error() -> UpstreamError {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        UpstreamError::Request(err)
    }

    impl Upstream for RecordingUpstream {
        fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamCallResult, UpstreamError>> {
            self.calls.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front();
            Box::pin(async move {
                match next {
                    Some(Scripted::Respond(result)) => Ok(result),
                    Some(Scripted::Fail) | None => Err(transport_error()),
                }
            })
        }
    }
}
