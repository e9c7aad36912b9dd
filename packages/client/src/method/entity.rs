//! Request bodies

use std::fmt;
use std::io::{self, Read, Write};

use bytes::Bytes;

/// A request body and the headers that describe it.
pub trait RequestEntity: Send + fmt::Debug {
    /// True if the body can be written more than once, as a retry needs.
    fn is_repeatable(&self) -> bool;

    /// Exact length in bytes; `None` sends the body chunked.
    fn content_length(&self) -> Option<u64>;

    fn content_type(&self) -> Option<&str>;

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()>;
}

/// An in-memory body.
#[derive(Debug, Clone)]
pub struct ByteArrayEntity {
    content: Bytes,
    content_type: Option<String>,
}

impl ByteArrayEntity {
    pub fn new(content: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    #[must_use]
    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

impl RequestEntity for ByteArrayEntity {
    fn is_repeatable(&self) -> bool {
        true
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.content.len() as u64)
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.content)
    }
}

/// Text encoded in the charset named by its content type.
///
/// UTF-8 is the default; ISO-8859-1 and US-ASCII are encoded byte per
/// character with unmappable characters replaced by `?`.
#[derive(Debug, Clone)]
pub struct StringEntity {
    inner: ByteArrayEntity,
}

impl StringEntity {
    /// `mime` defaults to `text/plain`, `charset` to `UTF-8`.
    #[must_use]
    pub fn new(text: &str, mime: Option<&str>, charset: Option<&str>) -> Self {
        let charset = charset.unwrap_or("UTF-8");
        let content = encode_text(text, charset);
        let content_type = format!("{}; charset={}", mime.unwrap_or("text/plain"), charset);
        Self {
            inner: ByteArrayEntity::new(content, Some(&content_type)),
        }
    }
}

fn encode_text(text: &str, charset: &str) -> Vec<u8> {
    let limit = match charset.to_ascii_lowercase().as_str() {
        "iso-8859-1" | "latin1" | "latin-1" => 0xFF,
        "us-ascii" | "ascii" => 0x7F,
        _ => return text.as_bytes().to_vec(),
    };
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok().filter(|b| u32::from(*b) <= limit).unwrap_or(b'?'))
        .collect()
}

impl RequestEntity for StringEntity {
    fn is_repeatable(&self) -> bool {
        true
    }

    fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    fn content_type(&self) -> Option<&str> {
        self.inner.content_type()
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.inner.write_to(out)
    }
}

/// A body read from a stream. Sent once; a retry after it was written fails.
pub struct StreamEntity {
    reader: Box<dyn Read + Send>,
    length: Option<u64>,
    content_type: Option<String>,
}

impl StreamEntity {
    /// With `length` unknown the body goes out chunked.
    pub fn new(reader: impl Read + Send + 'static, length: Option<u64>, content_type: Option<&str>) -> Self {
        Self {
            reader: Box::new(reader),
            length,
            content_type: content_type.map(str::to_string),
        }
    }
}

impl fmt::Debug for StreamEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEntity")
            .field("length", &self.length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl RequestEntity for StreamEntity {
    fn is_repeatable(&self) -> bool {
        false
    }

    fn content_length(&self) -> Option<u64> {
        self.length
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn write_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        match self.length {
            Some(length) => {
                let copied = io::copy(&mut (&mut self.reader).take(length), out)?;
                if copied < length {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("request body ended after {copied} of {length} bytes"),
                    ));
                }
                Ok(())
            }
            None => io::copy(&mut self.reader, out).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_entity_names_charset() {
        let mut entity = StringEntity::new("caf\u{e9}", None, Some("ISO-8859-1"));
        assert_eq!(entity.content_type(), Some("text/plain; charset=ISO-8859-1"));
        assert_eq!(entity.content_length(), Some(4));
        let mut out = Vec::new();
        entity.write_to(&mut out).expect("write");
        assert_eq!(out, b"caf\xe9");
    }

    #[test]
    fn ascii_replaces_unmappable() {
        let entity = StringEntity::new("\u{e9}t\u{e9}", Some("text/csv"), Some("US-ASCII"));
        assert_eq!(entity.inner.content().as_ref(), b"?t?");
    }

    #[test]
    fn short_stream_is_an_error() {
        let mut entity = StreamEntity::new(&b"abc"[..], Some(5), None);
        let mut out = Vec::new();
        let err = entity.write_to(&mut out).expect_err("too short");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(!entity.is_repeatable());
    }
}
