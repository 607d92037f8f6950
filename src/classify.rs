//! Status-code classification.
//!
//! Every completed HTTP exchange is mapped to exactly one [`ResponseClass`]
//! before any retry or error-handling decision is made. Classification is a
//! pure, total function of the status code: it never fails and never consults
//! state, so the same code always yields the same class.

use std::fmt;

/// The coarse outcome class of one HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseClass {
    /// 2xx: the exchange succeeded; neither registry is consulted.
    Success,
    /// 3xx: the server redirected the request elsewhere.
    Redirection,
    /// 4xx: the request itself was rejected; not transient.
    ClientError,
    /// 5xx and anything outside the known ranges.
    ServerError,
}

impl ResponseClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseClass::Success => "success",
            ResponseClass::Redirection => "redirection",
            ResponseClass::ClientError => "client_error",
            ResponseClass::ServerError => "server_error",
        }
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an HTTP status code to its [`ResponseClass`].
///
/// Out-of-range codes classify as [`ResponseClass::ServerError`]: the
/// fail-safe direction is "retry or report", never silent success.
pub fn classify(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        300..=399 => ResponseClass::Redirection,
        400..=499 => ResponseClass::ClientError,
        _ => ResponseClass::ServerError,
    }
}
