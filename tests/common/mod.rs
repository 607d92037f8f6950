//! Scripted in-memory transport for binder scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use restbind::transport::TransportError;
use restbind::{Error, RequestSpec, ResponseOutcome, Result, Transport};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Install the test log subscriber once per test binary. `RUST_LOG` controls
/// verbosity; output is captured per test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted attempt outcome.
pub enum Step {
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
    Fail(String),
}

pub fn step_status(status: u16) -> Step {
    Step::Respond {
        status,
        headers: Vec::new(),
        body: Bytes::new(),
    }
}

pub fn step_body(status: u16, body: &str) -> Step {
    Step::Respond {
        status,
        headers: Vec::new(),
        body: Bytes::from(body.to_string()),
    }
}

pub fn step_with_header(status: u16, name: &str, value: &str) -> Step {
    Step::Respond {
        status,
        headers: vec![(name.to_string(), value.to_string())],
        body: Bytes::new(),
    }
}

pub fn step_transport_failure(message: &str) -> Step {
    Step::Fail(message.to_string())
}

/// Transport that replays a fixed script and records every submitted request.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn request_header(&self, index: usize, name: &str) -> Option<String> {
        self.requests.lock().unwrap().get(index).and_then(|r| {
            r.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestSpec) -> Result<ResponseOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport script exhausted");
        match step {
            Step::Respond {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.insert(
                        HeaderName::from_bytes(name.as_bytes()).unwrap(),
                        HeaderValue::from_str(&value).unwrap(),
                    );
                }
                Ok(ResponseOutcome {
                    status,
                    headers: map,
                    body,
                    request: request.clone(),
                })
            }
            Step::Fail(message) => Err(Error::Transport(TransportError::Other(message))),
        }
    }
}
