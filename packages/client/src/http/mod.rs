//! HTTP/1.x wire format
//!
//! Header storage, status lines, and the body framing decoders shared by the
//! method state machine and the CONNECT tunnel.

pub mod body;
pub mod chunked;
pub mod headers;
pub mod length;
pub mod parser;
pub mod status_line;
pub mod version;

pub use body::BodyDecoder;
pub use chunked::{ChunkedDecoder, ChunkedWriter};
pub use headers::{Header, HeaderElement, HeaderGroup, NameValuePair};
pub use length::LengthDecoder;
pub use parser::{parse_headers, read_line};
pub use status_line::StatusLine;
pub use version::{HttpVersion, ParseVersionError};
