//! HTTP methods
//!
//! An [`HttpMethod`] is one request and its response. It writes itself onto
//! a connection, reads the response head, and streams the body off the same
//! connection on demand.

mod abort;
mod connect;
mod core;
pub mod entity;
pub mod keep_alive;
mod read;
mod write;

pub use abort::AbortHandle;
pub use self::core::{BodyReader, HttpMethod};
pub use entity::{ByteArrayEntity, RequestEntity, StreamEntity, StringEntity};
pub use keep_alive::should_close_connection;
pub use write::ContinueOutcome;
