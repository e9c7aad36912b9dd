pub mod classification;
pub mod constructors;
pub mod helpers;
pub mod types;

pub use constructors::*;
pub use helpers::{ConnectionShutdown, TlsHandshake, UnknownHost};
pub use types::{Error, Inner, Kind, Result};
