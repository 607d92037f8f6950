//! Error-body parsing collaborator.
//!
//! The wire format of provider error bodies is out of scope here; handlers
//! receive a [`BodyParser`] and degrade gracefully when it cannot make sense
//! of a body.

use thiserror::Error;

/// Failure local to a handler's parse step. Never becomes the outcome of a
/// call: handlers fall back to the generic wrapped error instead.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed error body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("error body has no recognizable error shape")]
    UnrecognizedShape,
}

/// Structured detail extracted from a provider error body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderErrorDetail {
    /// Provider error code, e.g. `"invalid_api_key"`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

pub trait BodyParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<ProviderErrorDetail, ParseError>;
}

/// Default parser for JSON error bodies.
///
/// Understands the common nested shape `{"error": {"code", "message"}}` and
/// the flat `{"code", "message"}` variant.
pub struct JsonBodyParser;

impl BodyParser for JsonBodyParser {
    fn parse(&self, body: &[u8]) -> Result<ProviderErrorDetail, ParseError> {
        let json: serde_json::Value = serde_json::from_slice(body)?;
        let obj = json.get("error").unwrap_or(&json);

        let code = obj
            .get("code")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let message = obj
            .get("message")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        if code.is_none() && message.is_none() {
            return Err(ParseError::UnrecognizedShape);
        }

        Ok(ProviderErrorDetail { code, message })
    }
}
