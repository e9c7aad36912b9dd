//! Fluent request builder
//!
//! Settings, headers, authentication and body are chained on a [`Tether`];
//! a terminal verb executes the request.

pub mod auth;
pub mod body;
pub mod core;
pub mod headers;
pub mod methods;

pub use self::core::{BodyNotSet, BodySet, ContentType, Tether};
pub use headers::header;
