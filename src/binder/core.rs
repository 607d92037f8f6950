use crate::binder::cancel::{cancel_pair, CancelHandle};
use crate::binding::ClientBindingSpec;
use crate::handlers::{ErrorHandlerRegistry, RetryPolicyRegistry};
use crate::transport::{RequestSpec, Transport};
use crate::Result;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// The bound, retry-aware client.
///
/// Generated per-method code translates each method of the synchronous
/// interface into a [`RequestSpec`] and calls [`invoke`](Self::invoke); every
/// invocation runs its own independent retry state machine. The binding spec
/// and both registries are immutable after construction and shared read-only
/// across concurrent calls, so no locks are needed.
pub struct BoundClient {
    pub(crate) spec: ClientBindingSpec,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) error_handlers: ErrorHandlerRegistry,
    pub(crate) retry_policies: RetryPolicyRegistry,
    /// Hard ceiling on retries per logical call, independent of any policy.
    /// Guarantees termination even for a policy that always asks to retry.
    pub(crate) max_attempts: u32,
}

impl std::fmt::Debug for BoundClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundClient")
            .field("spec", &self.spec)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Successful terminal value of one logical call.
#[derive(Debug)]
pub struct ServiceResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ServiceResponse {
    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Observability summary of one completed logical call.
#[derive(Debug, Clone)]
pub struct CallStats {
    /// Total HTTP attempts issued, including the first.
    pub attempts: u32,
    /// Retry loop iterations (attempts - 1).
    pub retry_count: u32,
    /// Status of the final response.
    pub http_status: u16,
    pub duration_ms: u128,
    /// Client-side correlation id stamped on every attempt.
    pub client_request_id: String,
    /// Correlation id reported by the remote side, when present.
    pub upstream_request_id: Option<String>,
}

impl BoundClient {
    pub fn binding(&self) -> &ClientBindingSpec {
        &self.spec
    }

    /// Run one logical call to a terminal outcome: exactly one success value
    /// or one error, never both.
    pub async fn invoke(&self, request: RequestSpec) -> Result<ServiceResponse> {
        self.run(request, None).await.map(|(resp, _)| resp)
    }

    /// As [`invoke`](Self::invoke), returning per-call statistics.
    pub async fn invoke_with_stats(
        &self,
        request: RequestSpec,
    ) -> Result<(ServiceResponse, CallStats)> {
        self.run(request, None).await
    }

    /// As [`invoke`](Self::invoke), with a handle that cancels the call.
    pub fn invoke_cancellable(
        &self,
        request: RequestSpec,
    ) -> (
        CancelHandle,
        impl std::future::Future<Output = Result<ServiceResponse>> + '_,
    ) {
        let (handle, token) = cancel_pair();
        let fut = async move { self.run(request, Some(token)).await.map(|(resp, _)| resp) };
        (handle, fut)
    }
}
