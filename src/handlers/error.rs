use crate::classify::{classify, ResponseClass};
use crate::handlers::body::{BodyParser, JsonBodyParser};
use crate::transport::ResponseOutcome;
use crate::{Error, ErrorContext};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Headers commonly carrying an upstream correlation id.
const UPSTREAM_ID_HEADERS: &[&str] = &["x-request-id", "request-id", "x-amzn-requestid"];

/// Converts a failing exchange into the terminal error for the call.
///
/// Handlers are pure with respect to the outcome: bounded local parsing only,
/// no shared-state mutation, no new HTTP calls.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, outcome: &ResponseOutcome) -> Error;
}

fn outcome_context(outcome: &ResponseOutcome, source: &'static str) -> ErrorContext {
    let mut context = ErrorContext::new()
        .with_status_code(outcome.status)
        .with_source(source);
    if let Some(upstream) = outcome.header_first(UPSTREAM_ID_HEADERS) {
        context = context.with_details(format!("upstream_id: {}", upstream));
    }
    context
}

/// Fallback handler: wraps status and raw body without semantic parsing.
pub struct GenericErrorHandler;

impl ErrorHandler for GenericErrorHandler {
    fn handle(&self, outcome: &ResponseOutcome) -> Error {
        Error::Classified {
            class: classify(outcome.status),
            status: outcome.status,
            code: None,
            message: outcome.body_text().into_owned(),
            context: outcome_context(outcome, "generic_error_handler"),
        }
    }
}

/// Default handler for client and server errors: extracts provider detail
/// from the body via the injected parser, degrading to the generic wrap when
/// the body cannot be parsed.
pub struct JsonErrorHandler {
    parser: Arc<dyn BodyParser>,
}

impl JsonErrorHandler {
    pub fn new(parser: Arc<dyn BodyParser>) -> Self {
        Self { parser }
    }
}

impl ErrorHandler for JsonErrorHandler {
    fn handle(&self, outcome: &ResponseOutcome) -> Error {
        match self.parser.parse(&outcome.body) {
            Ok(detail) => Error::Classified {
                class: classify(outcome.status),
                status: outcome.status,
                message: detail
                    .message
                    .unwrap_or_else(|| outcome.body_text().into_owned()),
                code: detail.code,
                context: outcome_context(outcome, "json_error_handler"),
            },
            Err(e) => {
                // Parse failure must not become the call's outcome.
                debug!(
                    http_status = outcome.status,
                    error = %e,
                    "error body not parseable, degrading to generic wrap"
                );
                GenericErrorHandler.handle(outcome)
            }
        }
    }
}

/// Per-class handler lookup. Fixed fields, so lookup is O(1) and every class
/// always has an active handler.
#[derive(Clone)]
pub struct ErrorHandlerRegistry {
    success: Arc<dyn ErrorHandler>,
    redirection: Arc<dyn ErrorHandler>,
    client_error: Arc<dyn ErrorHandler>,
    server_error: Arc<dyn ErrorHandler>,
}

static DEFAULT_ERROR_HANDLERS: Lazy<ErrorHandlerRegistry> = Lazy::new(|| {
    let json: Arc<dyn ErrorHandler> = Arc::new(JsonErrorHandler::new(Arc::new(JsonBodyParser)));
    ErrorHandlerRegistry {
        success: Arc::new(GenericErrorHandler),
        redirection: Arc::new(GenericErrorHandler),
        client_error: json.clone(),
        server_error: json,
    }
});

impl ErrorHandlerRegistry {
    /// The process-wide immutable defaults.
    pub fn defaults() -> Self {
        DEFAULT_ERROR_HANDLERS.clone()
    }

    /// Defaults with a custom body parser behind the JSON handlers.
    pub fn defaults_with_parser(parser: Arc<dyn BodyParser>) -> Self {
        let json: Arc<dyn ErrorHandler> = Arc::new(JsonErrorHandler::new(parser));
        Self {
            success: Arc::new(GenericErrorHandler),
            redirection: Arc::new(GenericErrorHandler),
            client_error: json.clone(),
            server_error: json,
        }
    }

    pub fn handler(&self, class: ResponseClass) -> &Arc<dyn ErrorHandler> {
        match class {
            ResponseClass::Success => &self.success,
            ResponseClass::Redirection => &self.redirection,
            ResponseClass::ClientError => &self.client_error,
            ResponseClass::ServerError => &self.server_error,
        }
    }

    pub fn with_override(mut self, class: ResponseClass, handler: Arc<dyn ErrorHandler>) -> Self {
        match class {
            ResponseClass::Success => self.success = handler,
            ResponseClass::Redirection => self.redirection = handler,
            ResponseClass::ClientError => self.client_error = handler,
            ResponseClass::ServerError => self.server_error = handler,
        }
        self
    }

    /// Apply a set of per-class overrides on top of this registry.
    pub fn merged(self, overrides: HashMap<ResponseClass, Arc<dyn ErrorHandler>>) -> Self {
        overrides
            .into_iter()
            .fold(self, |reg, (class, handler)| reg.with_override(class, handler))
    }
}

impl Default for ErrorHandlerRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}
