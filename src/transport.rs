//! HTTP transport collaborator.
//!
//! The binder never talks to the network directly. It hands a [`RequestSpec`]
//! to a [`Transport`] and receives a [`ResponseOutcome`] per attempt; retries
//! resubmit a (possibly mutated) clone of the spec. [`http::HttpTransport`]
//! is the production implementation.

pub mod http;

pub use http::{HttpTransport, TransportError};

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::borrow::Cow;
use tracing::debug;

/// One HTTP request as the binder sees it: method, absolute URL, headers and
/// optional body. `Clone` so a retry can resubmit a mutated copy while the
/// originating spec stays attached to the previous attempt's outcome.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Serialize `value` as the JSON body and set the content type.
    pub fn with_json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        self.body = Some(Bytes::from(body));
        self.set_header("content-type", "application/json");
        Ok(self)
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.insert(n, v);
            }
            _ => debug!(header = name, "skipping invalid header"),
        }
    }
}

/// The result of one HTTP exchange. Ephemeral: created per attempt and
/// discarded once classified and handled.
#[derive(Debug)]
pub struct ResponseOutcome {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// The request that produced this response, as actually submitted.
    pub request: RequestSpec,
}

impl ResponseOutcome {
    /// First value of `name`, when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First header among `names` that is present, e.g. upstream request ids.
    pub fn header_first(&self, names: &[&str]) -> Option<String> {
        names
            .iter()
            .find_map(|n| self.header(n))
            .map(|s| s.to_string())
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Execution engine contract: submit one request, produce one outcome.
///
/// Implementations fail with a transport-kind error (network failure) that is
/// distinct from HTTP-level client/server errors; the binder routes such
/// failures through the server-error retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestSpec) -> Result<ResponseOutcome>;
}
