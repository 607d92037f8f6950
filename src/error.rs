use crate::classify::ResponseClass;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "binding.sync", "request.url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., upstream request id, raw body excerpt)
    pub details: Option<String>,
    /// Source of the error (e.g., "type_pair_resolver", "error_handler")
    pub source: Option<String>,
    /// HTTP status of the attempt that produced this error, when applicable
    pub status_code: Option<u16>,
    /// Client-side correlation id for the logical call
    pub request_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Unified error type for the binding and resilience layer.
///
/// Setup-time failures (`UnboundType`, `Configuration`) abort binding
/// construction synchronously. Everything else is produced by the per-call
/// state machine, which surfaces exactly one terminal error per logical call.
#[derive(Debug, Error)]
pub enum Error {
    /// A descriptor supplied for binding still carries an unresolved generic
    /// type variable. Raised eagerly at binding construction, never at first
    /// request.
    #[error(
        "unbound type variable `{variable}` in `{descriptor}`: construct the binding from \
         descriptors with explicitly resolved type arguments"
    )]
    UnboundType { descriptor: String, variable: String },

    #[error("configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The transport failed before producing an HTTP response. Transient by
    /// default; routed through the server-error retry policy.
    #[error("network transport error: {0}")]
    Transport(#[from] TransportError),

    /// A completed HTTP exchange that the retry policy declined to retry.
    #[error("remote error: HTTP {status} ({class}): {message}{}", format_context(.context))]
    Classified {
        class: ResponseClass,
        status: u16,
        /// Provider-specific error code, when the body parser could extract one.
        code: Option<String>,
        message: String,
        context: ErrorContext,
    },

    /// The retry ceiling was reached while the failure was still considered
    /// retryable. Distinguishable from `Classified` so callers can tell "the
    /// server kept failing" apart from "the server definitively rejected this".
    #[error("retry attempts exhausted after {attempts} attempts: {source}")]
    RetryExhausted { attempts: u32, source: Box<Error> },

    /// The enclosing call was cancelled while waiting, before reaching a
    /// terminal outcome.
    #[error("call cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(ref id) = ctx.request_id {
        parts.push(format!("request_id: {}", id));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// The response class of the failing exchange, if this error carries one.
    pub fn class(&self) -> Option<ResponseClass> {
        match self {
            Error::Classified { class, .. } => Some(*class),
            Error::RetryExhausted { source, .. } => source.class(),
            _ => None,
        }
    }

    /// The HTTP status of the failing exchange, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Classified { status, .. } => Some(*status),
            Error::RetryExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Classified { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}
