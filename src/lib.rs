//! # restbind
//!
//! Binding and resilience layer for generated REST API clients.
//!
//! ## Overview
//!
//! This library turns a pair of interface descriptors — a blocking client
//! interface and the non-blocking invoker interface describing the same
//! remote API — into a single bound client wired to an HTTP execution
//! engine, with classification-driven error reporting and retry policy.
//!
//! It is the layer a REST client generator sits on: generated per-method
//! code builds a [`RequestSpec`] and hands it to [`BoundClient::invoke`],
//! which owns the per-call retry state machine.
//!
//! ## Core Philosophy
//!
//! - **Eager validation**: descriptor problems fail at binding construction,
//!   never as a confusing dispatch error at first request
//! - **Classification-driven**: every completed exchange maps to one
//!   [`ResponseClass`]; retry policy and error handling are pluggable per
//!   class
//! - **Explicit composition**: handler overrides are plain configuration
//!   ([`BinderConfig`]), not subclass hooks
//! - **Guaranteed termination**: every retry path is bounded by a policy
//!   ceiling and a binder-level attempt ceiling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restbind::{BinderBuilder, InterfaceDescriptor, RequestSpec};
//!
//! #[tokio::main]
//! async fn main() -> restbind::Result<()> {
//!     let client = BinderBuilder::new()
//!         .interfaces(
//!             InterfaceDescriptor::of::<dyn BlobStore>(),
//!             InterfaceDescriptor::of::<dyn AsyncBlobStore>(),
//!         )
//!         .build()?;
//!
//!     let resp = client
//!         .invoke(RequestSpec::get("https://api.example.com/v1/containers"))
//!         .await?;
//!     println!("{}", resp.body_text());
//!     Ok(())
//! }
//!
//! trait BlobStore {}
//! trait AsyncBlobStore {}
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`binding`] | Interface descriptors and eager type-pair validation |
//! | [`classify`] | Status-code classification |
//! | [`handlers`] | Per-class error handlers and retry policies |
//! | [`binder`] | Bound client, builder and the per-call state machine |
//! | [`transport`] | HTTP execution engine behind the `Transport` trait |

pub mod binder;
pub mod binding;
pub mod classify;
pub mod handlers;
pub mod transport;

// Re-export main types for convenience
pub use binder::{BinderBuilder, BinderConfig, BoundClient, CallStats, CancelHandle, ServiceResponse};
pub use binding::{ClientBindingSpec, InterfaceDescriptor, TypeArg, TypePairResolver};
pub use classify::{classify, ResponseClass};
pub use handlers::{
    BackoffPolicy, BodyParser, ErrorHandler, JsonBodyParser, NeverRetryPolicy, RedirectPolicy,
    RequestHints, RetryDecision, RetryPolicy, RetryState,
};
pub use transport::{HttpTransport, RequestSpec, ResponseOutcome, Transport};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
