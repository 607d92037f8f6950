//! Interface-pair binding and eager type validation.
//!
//! A binding pairs a blocking client interface with the non-blocking invoker
//! interface describing the same remote API. Both sides are described by an
//! [`InterfaceDescriptor`]; [`TypePairResolver`] validates the pair once at
//! setup so that an unresolved generic argument fails construction instead of
//! surfacing later as a confusing dispatch error at first request.

pub mod descriptor;
pub mod spec;

pub use descriptor::{InterfaceDescriptor, TypeArg};
pub use spec::{ClientBindingSpec, TypePairResolver};
