use crate::classify::ResponseClass;
use crate::transport::{ResponseOutcome, TransportError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Default retry ceiling for the server-error backoff policy: up to 5
/// retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

const DEFAULT_MIN_DELAY_MS: u64 = 50;
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// What a retry policy sees about the failed attempt.
pub enum FailedAttempt<'a> {
    /// A completed HTTP exchange with a non-success classification.
    Response(&'a ResponseOutcome),
    /// The transport failed before any response was produced.
    Transport(&'a TransportError),
}

impl FailedAttempt<'_> {
    pub fn status(&self) -> Option<u16> {
        match self {
            FailedAttempt::Response(o) => Some(o.status),
            FailedAttempt::Transport(_) => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        match self {
            FailedAttempt::Response(o) => o.header(name),
            FailedAttempt::Transport(_) => None,
        }
    }
}

/// Mutations the transport applies to the request before resubmission.
/// The policy only annotates; it never re-issues the HTTP call itself.
#[derive(Debug, Clone, Default)]
pub struct RequestHints {
    /// New target for the next attempt, resolved against the previous URL.
    pub location: Option<String>,
    /// Headers to set (e.g. an adjusted auth token) before resubmission.
    pub set_headers: Vec<(String, String)>,
}

impl RequestHints {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.set_headers.is_empty()
    }
}

/// Outcome of consulting a retry policy for one failed attempt.
#[derive(Debug, Clone, Default)]
pub struct RetryDecision {
    pub retry: bool,
    /// Scheduled suspension before the next attempt; never a busy wait.
    pub delay: Duration,
    pub hints: RequestHints,
    /// Set when the policy declined because its own attempt ceiling was
    /// reached; the binder surfaces this as `RetryExhausted`.
    pub exhausted: bool,
}

impl RetryDecision {
    pub fn no_retry() -> Self {
        Self::default()
    }

    pub fn exhausted() -> Self {
        Self {
            exhausted: true,
            ..Self::default()
        }
    }

    pub fn after(delay: Duration) -> Self {
        Self {
            retry: true,
            delay,
            ..Self::default()
        }
    }

    pub fn with_hints(mut self, hints: RequestHints) -> Self {
        self.hints = hints;
        self
    }
}

/// Per-logical-request attempt tracking. Owned exclusively by the in-flight
/// call; created at `Pending`, dropped when the call terminates.
#[derive(Debug, Default)]
pub struct RetryState {
    attempt: u32,
    redirects_followed: u32,
    total_delay: Duration,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retries performed so far (0 during the initial attempt).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Total attempts including the initial one.
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }

    /// Redirects followed so far in this logical call. Tracked apart from
    /// the attempt count so earlier retries of other classes do not consume
    /// the redirect allowance.
    pub fn redirects_followed(&self) -> u32 {
        self.redirects_followed
    }

    /// Record one followed redirect. The binder calls this when it applies
    /// a location hint.
    pub fn record_redirect(&mut self) {
        self.redirects_followed = self.redirects_followed.saturating_add(1);
    }

    /// Record one retry loop iteration. The binder calls this exactly once
    /// per `Retrying` transition, so the count increases by exactly 1.
    pub fn record_retry(&mut self, delay: Duration) {
        self.attempt = self.attempt.saturating_add(1);
        self.total_delay += delay;
    }
}

/// Per-class retry decision logic.
///
/// Policies decide and annotate only; the binder applies hints, schedules the
/// delay and resubmits. Implementations must enforce an attempt ceiling so
/// that every call terminates.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, state: &RetryState, attempt: &FailedAttempt<'_>) -> RetryDecision;
}

/// Default for `ClientError`: client errors are not transient.
pub struct NeverRetryPolicy;

impl RetryPolicy for NeverRetryPolicy {
    fn should_retry(&self, _state: &RetryState, _attempt: &FailedAttempt<'_>) -> RetryDecision {
        RetryDecision::no_retry()
    }
}

/// Default for `Redirection`: follow the `Location` header, once.
pub struct RedirectPolicy {
    pub max_redirects: u32,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self { max_redirects: 1 }
    }
}

impl RetryPolicy for RedirectPolicy {
    fn should_retry(&self, state: &RetryState, attempt: &FailedAttempt<'_>) -> RetryDecision {
        if state.redirects_followed() >= self.max_redirects {
            return RetryDecision::no_retry();
        }
        match attempt.header("location") {
            Some(location) => RetryDecision::after(Duration::ZERO).with_hints(RequestHints {
                location: Some(location.to_string()),
                set_headers: Vec::new(),
            }),
            // A redirect without a target is not followable.
            None => RetryDecision::no_retry(),
        }
    }
}

/// Default for `ServerError` and transport failures: bounded retries with
/// exponential backoff (`min_delay * 2^attempt`, capped at `max_delay`).
/// A `Retry-After` header in seconds overrides the computed delay.
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_retries: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// Defaults with `RESTBIND_MIN_DELAY_MS` / `RESTBIND_MAX_DELAY_MS`
    /// overrides applied.
    pub fn from_env() -> Self {
        let min_delay_ms = env::var("RESTBIND_MIN_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MIN_DELAY_MS);
        let max_delay_ms = env::var("RESTBIND_MAX_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_DELAY_MS);
        Self::new(
            DEFAULT_MAX_RETRIES,
            Duration::from_millis(min_delay_ms),
            Duration::from_millis(max_delay_ms),
        )
    }

    fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        // exponential backoff: min_delay * 2^attempt
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let base = self.min_delay.saturating_mul(factor);
        retry_after.unwrap_or(base).min(self.max_delay)
    }

    fn retry_after(attempt: &FailedAttempt<'_>) -> Option<Duration> {
        attempt
            .header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, state: &RetryState, attempt: &FailedAttempt<'_>) -> RetryDecision {
        if state.attempt() >= self.max_retries {
            return RetryDecision::exhausted();
        }
        RetryDecision::after(self.backoff_delay(state.attempt(), Self::retry_after(attempt)))
    }
}

/// Per-class policy lookup, O(1) via fixed fields. `Success` has an entry so
/// every class resolves, but the binder never consults it.
#[derive(Clone)]
pub struct RetryPolicyRegistry {
    success: Arc<dyn RetryPolicy>,
    redirection: Arc<dyn RetryPolicy>,
    client_error: Arc<dyn RetryPolicy>,
    server_error: Arc<dyn RetryPolicy>,
}

static DEFAULT_RETRY_POLICIES: Lazy<RetryPolicyRegistry> = Lazy::new(|| RetryPolicyRegistry {
    success: Arc::new(NeverRetryPolicy),
    redirection: Arc::new(RedirectPolicy::default()),
    client_error: Arc::new(NeverRetryPolicy),
    server_error: Arc::new(BackoffPolicy::from_env()),
});

impl RetryPolicyRegistry {
    /// The process-wide immutable defaults.
    pub fn defaults() -> Self {
        DEFAULT_RETRY_POLICIES.clone()
    }

    pub fn policy(&self, class: ResponseClass) -> &Arc<dyn RetryPolicy> {
        match class {
            ResponseClass::Success => &self.success,
            ResponseClass::Redirection => &self.redirection,
            ResponseClass::ClientError => &self.client_error,
            ResponseClass::ServerError => &self.server_error,
        }
    }

    pub fn with_override(mut self, class: ResponseClass, policy: Arc<dyn RetryPolicy>) -> Self {
        match class {
            ResponseClass::Success => self.success = policy,
            ResponseClass::Redirection => self.redirection = policy,
            ResponseClass::ClientError => self.client_error = policy,
            ResponseClass::ServerError => self.server_error = policy,
        }
        self
    }

    /// Apply a set of per-class overrides on top of this registry.
    pub fn merged(self, overrides: HashMap<ResponseClass, Arc<dyn RetryPolicy>>) -> Self {
        overrides
            .into_iter()
            .fold(self, |reg, (class, policy)| reg.with_override(class, policy))
    }
}

impl Default for RetryPolicyRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
