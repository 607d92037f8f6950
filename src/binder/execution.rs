//! Per-call state machine: Pending -> Attempting -> Classifying ->
//! {Retrying -> Attempting | Succeeding | Failing} -> Done.
//!
//! Per-attempt failures never escape this loop directly; only the terminal
//! state's single value is surfaced to the caller.

use crate::binder::cancel::CancelToken;
use crate::binder::core::{BoundClient, CallStats, ServiceResponse};
use crate::classify::{classify, ResponseClass};
use crate::handlers::{FailedAttempt, RequestHints, RetryState};
use crate::transport::RequestSpec;
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Correlation header stamped on every attempt of a logical call.
const REQUEST_ID_HEADER: &str = "x-restbind-request-id";

const UPSTREAM_ID_HEADERS: &[&str] = &["x-request-id", "request-id", "x-amzn-requestid"];

impl BoundClient {
    pub(crate) async fn run(
        &self,
        request: RequestSpec,
        mut cancel: Option<CancelToken>,
    ) -> Result<(ServiceResponse, CallStats)> {
        // Pending: the call owns its retry state for its whole lifetime.
        let mut state = RetryState::new();
        let client_request_id = Uuid::new_v4().to_string();
        let start = std::time::Instant::now();

        let mut current = request;
        current.set_header(REQUEST_ID_HEADER, &client_request_id);

        loop {
            // Attempting: the only suspension point besides the retry delay.
            let sent = match cancel.as_mut() {
                Some(token) => {
                    tokio::select! {
                        r = self.transport.send(&current) => r,
                        _ = token.cancelled() => Err(Error::Cancelled),
                    }
                }
                None => self.transport.send(&current).await,
            };

            match sent {
                Ok(outcome) => {
                    // Classifying
                    let class = classify(outcome.status);
                    if class == ResponseClass::Success {
                        // Succeeding -> Done
                        let stats = CallStats {
                            attempts: state.attempts_made(),
                            retry_count: state.attempt(),
                            http_status: outcome.status,
                            duration_ms: start.elapsed().as_millis(),
                            client_request_id: client_request_id.clone(),
                            upstream_request_id: outcome.header_first(UPSTREAM_ID_HEADERS),
                        };
                        info!(
                            http_status = outcome.status,
                            attempts = stats.attempts,
                            duration_ms = stats.duration_ms,
                            client_request_id = client_request_id.as_str(),
                            "call succeeded"
                        );
                        return Ok((
                            ServiceResponse {
                                status: outcome.status,
                                headers: outcome.headers,
                                body: outcome.body,
                            },
                            stats,
                        ));
                    }

                    // Retry policy is consulted before any error handler.
                    let decision = {
                        let failed = FailedAttempt::Response(&outcome);
                        self.retry_policies
                            .policy(class)
                            .should_retry(&state, &failed)
                    };
                    warn!(
                        http_status = outcome.status,
                        error_class = class.as_str(),
                        attempt = state.attempts_made(),
                        retry = decision.retry,
                        client_request_id = client_request_id.as_str(),
                        "attempt failed"
                    );

                    if decision.retry {
                        if state.attempts_made() >= self.max_attempts {
                            // Policy still wants to retry but the binder
                            // ceiling is reached: terminate, never loop.
                            let last = self.error_handlers.handler(class).handle(&outcome);
                            return Err(Error::RetryExhausted {
                                attempts: state.attempts_made(),
                                source: Box::new(last),
                            });
                        }
                        self.apply_hints(&mut current, &decision.hints);
                        if decision.hints.location.is_some() {
                            state.record_redirect();
                        }
                        state.record_retry(decision.delay);
                        self.wait(decision.delay, cancel.as_mut()).await?;
                        continue; // Retrying -> Attempting
                    }

                    // Failing -> Done
                    let err = self.error_handlers.handler(class).handle(&outcome);
                    if decision.exhausted {
                        return Err(Error::RetryExhausted {
                            attempts: state.attempts_made(),
                            source: Box::new(err),
                        });
                    }
                    return Err(err);
                }

                Err(Error::Cancelled) => return Err(Error::Cancelled),

                // Transport failures take the server-error retry path unless
                // an override says otherwise.
                Err(Error::Transport(te)) => {
                    let decision = {
                        let failed = FailedAttempt::Transport(&te);
                        self.retry_policies
                            .policy(ResponseClass::ServerError)
                            .should_retry(&state, &failed)
                    };
                    warn!(
                        error = %te,
                        attempt = state.attempts_made(),
                        retry = decision.retry,
                        client_request_id = client_request_id.as_str(),
                        "transport failure"
                    );

                    if decision.retry {
                        if state.attempts_made() >= self.max_attempts {
                            return Err(Error::RetryExhausted {
                                attempts: state.attempts_made(),
                                source: Box::new(Error::Transport(te)),
                            });
                        }
                        self.apply_hints(&mut current, &decision.hints);
                        if decision.hints.location.is_some() {
                            state.record_redirect();
                        }
                        state.record_retry(decision.delay);
                        self.wait(decision.delay, cancel.as_mut()).await?;
                        continue;
                    }
                    if decision.exhausted {
                        return Err(Error::RetryExhausted {
                            attempts: state.attempts_made(),
                            source: Box::new(Error::Transport(te)),
                        });
                    }
                    return Err(Error::Transport(te));
                }

                Err(other) => return Err(other),
            }
        }
    }

    /// Scheduled suspension before the next attempt. Cancellation here
    /// short-circuits to `Done`, never into another retry.
    async fn wait(&self, delay: Duration, cancel: Option<&mut CancelToken>) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(()),
                    _ = token.cancelled() => Err(Error::Cancelled),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn apply_hints(&self, request: &mut RequestSpec, hints: &RequestHints) {
        if let Some(location) = &hints.location {
            match resolve_location(&request.url, location) {
                Some(url) => {
                    debug!(target_url = url.as_str(), "following redirect target");
                    request.url = url;
                }
                None => warn!(location = location.as_str(), "unresolvable redirect target"),
            }
        }
        for (name, value) in &hints.set_headers {
            request.set_header(name, value);
        }
    }
}

/// Resolve a `Location` value against the URL of the previous attempt.
fn resolve_location(base: &str, location: &str) -> Option<String> {
    match Url::parse(location) {
        Ok(absolute) => Some(absolute.into()),
        Err(_) => Url::parse(base).ok()?.join(location).ok().map(Into::into),
    }
}
