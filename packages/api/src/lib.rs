//! # Tether
//!
//! Blocking HTTP/1.x client with a fluent builder over pooled persistent
//! connections.
//!
//! ```no_run
//! use tether::Tether;
//!
//! let response = Tether::new()
//!     .header(
//!         http::header::ACCEPT,
//!         http::HeaderValue::from_static("text/plain"),
//!     )
//!     .get("http://example.com/")?;
//! println!("{}", response.status());
//! println!("{}", response.text()?);
//! # Ok::<(), tether::Error>(())
//! ```
//!
//! The engine underneath is [`tether_client`]; build an [`HttpClient`] with
//! custom parameters or a different connection manager and hand it to
//! [`Tether::with_client`].

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;
pub mod response;

pub use builder::{BodyNotSet, BodySet, ContentType, Tether, header};
pub use response::Response;

pub use tether_client::{
    BodyReader, ClientParams, ConnectionManagerParams, Error, HostConfiguration, HttpClient,
    HttpMethod, MethodParams, MultiThreadedConnectionManager, Result,
};

/// Start a request on the process-wide client.
///
/// Shorthand for [`Tether::new`]
#[must_use]
pub fn new() -> Tether {
    Tether::new()
}

/// Start a request on `client`.
///
/// Shorthand for [`Tether::with_client`]
#[must_use]
pub fn with_client(client: &HttpClient) -> Tether {
    Tether::with_client(client)
}
