use crate::binder::core::BoundClient;
use crate::binding::{InterfaceDescriptor, TypePairResolver};
use crate::classify::ResponseClass;
use crate::handlers::{
    BodyParser, ErrorHandler, ErrorHandlerRegistry, RetryPolicy, RetryPolicyRegistry,
};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, ErrorContext, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Hard default ceiling on total attempts per logical call. High enough to
/// sit above every default policy ceiling, low enough to guarantee
/// termination for a policy that always asks to retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Explicit per-client overrides for both registries.
///
/// This replaces implicit subclass hooks with testable composition: the
/// recognized options are enumerated here and merged over the process-wide
/// defaults at setup time.
#[derive(Clone, Default)]
pub struct BinderConfig {
    pub error_handlers: HashMap<ResponseClass, Arc<dyn ErrorHandler>>,
    pub retry_policies: HashMap<ResponseClass, Arc<dyn RetryPolicy>>,
}

impl BinderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handler(
        mut self,
        class: ResponseClass,
        handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        self.error_handlers.insert(class, handler);
        self
    }

    pub fn with_retry_policy(
        mut self,
        class: ResponseClass,
        policy: Arc<dyn RetryPolicy>,
    ) -> Self {
        self.retry_policies.insert(class, policy);
        self
    }
}

/// Builder for [`BoundClient`].
///
/// Keep this surface area small and predictable. `build` runs the type-pair
/// validation eagerly: an unresolved descriptor fails here, before any
/// request traffic.
pub struct BinderBuilder {
    sync: Option<InterfaceDescriptor>,
    invoker: Option<InterfaceDescriptor>,
    sync_to_async: HashMap<String, String>,
    config: BinderConfig,
    transport: Option<Arc<dyn Transport>>,
    body_parser: Option<Arc<dyn BodyParser>>,
    max_attempts: Option<u32>,
}

impl BinderBuilder {
    pub fn new() -> Self {
        Self {
            sync: None,
            invoker: None,
            sync_to_async: HashMap::new(),
            config: BinderConfig::new(),
            transport: None,
            body_parser: None,
            max_attempts: None,
        }
    }

    /// The sync/async descriptor pair to bind.
    pub fn interfaces(mut self, sync: InterfaceDescriptor, invoker: InterfaceDescriptor) -> Self {
        self.sync = Some(sync);
        self.invoker = Some(invoker);
        self
    }

    /// Route one sync facade type to a specific async backend type.
    pub fn route(mut self, sync_type: impl Into<String>, async_type: impl Into<String>) -> Self {
        self.sync_to_async.insert(sync_type.into(), async_type.into());
        self
    }

    /// Replace the whole override set at once.
    pub fn config(mut self, config: BinderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn error_handler(mut self, class: ResponseClass, handler: Arc<dyn ErrorHandler>) -> Self {
        self.config.error_handlers.insert(class, handler);
        self
    }

    pub fn retry_policy(mut self, class: ResponseClass, policy: Arc<dyn RetryPolicy>) -> Self {
        self.config.retry_policies.insert(class, policy);
        self
    }

    /// Inject a transport. Default is [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Inject the error-body parser used by the default handlers.
    pub fn body_parser(mut self, parser: Arc<dyn BodyParser>) -> Self {
        self.body_parser = Some(parser);
        self
    }

    /// Ceiling on total attempts per logical call (default
    /// [`DEFAULT_MAX_ATTEMPTS`], env `RESTBIND_MAX_ATTEMPTS`).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n.max(1));
        self
    }

    /// Validate the type pair and assemble the bound client.
    pub fn build(self) -> Result<BoundClient> {
        let sync = self.sync.ok_or_else(|| {
            Error::configuration_with_context(
                "missing sync interface descriptor",
                ErrorContext::new()
                    .with_field_path("binding.sync")
                    .with_source("binder_builder"),
            )
        })?;
        let invoker = self.invoker.ok_or_else(|| {
            Error::configuration_with_context(
                "missing async interface descriptor",
                ErrorContext::new()
                    .with_field_path("binding.invoker")
                    .with_source("binder_builder"),
            )
        })?;

        // Eager validation: binding failures surface here, never at first use.
        let spec = TypePairResolver::resolve_with_overrides(sync, invoker, self.sync_to_async)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };

        let error_handlers = match self.body_parser {
            Some(parser) => ErrorHandlerRegistry::defaults_with_parser(parser),
            None => ErrorHandlerRegistry::defaults(),
        }
        .merged(self.config.error_handlers);
        let retry_policies = RetryPolicyRegistry::defaults().merged(self.config.retry_policies);

        let max_attempts = self
            .max_attempts
            .or_else(|| {
                std::env::var("RESTBIND_MAX_ATTEMPTS")
                    .ok()?
                    .parse::<u32>()
                    .ok()
            })
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1);

        Ok(BoundClient {
            spec,
            transport,
            error_handlers,
            retry_policies,
            max_attempts,
        })
    }
}

impl Default for BinderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
