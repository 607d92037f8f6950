//! Bound client construction and per-call execution.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/binder/`.

pub mod builder;
pub mod cancel;
pub mod core;
mod execution;

pub use builder::{BinderBuilder, BinderConfig};
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use core::{BoundClient, CallStats, ServiceResponse};
