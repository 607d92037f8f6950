//! Pluggable per-class handlers and policies.
//!
//! For every non-success exchange the binder consults the retry policy for
//! the response class first; only when the policy declines does the error
//! handler run to produce the terminal error. Defaults for all four classes
//! are built once per process and merged with per-client overrides at setup.

pub mod body;
pub mod error;
pub mod retry;

pub use body::{BodyParser, JsonBodyParser, ParseError, ProviderErrorDetail};
pub use error::{ErrorHandler, ErrorHandlerRegistry, GenericErrorHandler, JsonErrorHandler};
pub use retry::{
    BackoffPolicy, FailedAttempt, NeverRetryPolicy, RedirectPolicy, RequestHints, RetryDecision,
    RetryPolicy, RetryPolicyRegistry, RetryState, DEFAULT_MAX_RETRIES,
};
