//! Retry policy for transport failures

pub mod policy;

pub use policy::{DefaultMethodRetryHandler, MethodRetryHandler, exponential_backoff};
