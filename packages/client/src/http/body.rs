//! Response body framing

use std::io::{self, BufRead};

use super::chunked::ChunkedDecoder;
use super::headers::HeaderGroup;
use super::length::LengthDecoder;

/// How the end of a response body is found.
#[derive(Debug)]
pub enum BodyDecoder {
    /// No body follows the head.
    Empty,
    Chunked(ChunkedDecoder),
    Length(LengthDecoder),
    /// The body runs until the peer closes the connection.
    UntilClose { done: bool },
}

impl BodyDecoder {
    pub fn read<R: BufRead + ?Sized>(&mut self, src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BodyDecoder::Empty => Ok(0),
            BodyDecoder::Chunked(decoder) => decoder.read(src, buf),
            BodyDecoder::Length(decoder) => decoder.read(src, buf),
            BodyDecoder::UntilClose { done } => {
                if *done || buf.is_empty() {
                    return Ok(0);
                }
                let available = src.fill_buf()?;
                if available.is_empty() {
                    *done = true;
                    return Ok(0);
                }
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                src.consume(n);
                Ok(n)
            }
        }
    }

    /// Read and discard the rest of the body.
    pub fn drain<R: BufRead + ?Sized>(&mut self, src: &mut R) -> io::Result<u64> {
        let mut scratch = [0u8; 4096];
        let mut total = 0u64;
        loop {
            let n = self.read(src, &mut scratch)?;
            if n == 0 {
                return Ok(total);
            }
            total += n as u64;
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self {
            BodyDecoder::Empty => true,
            BodyDecoder::Chunked(decoder) => decoder.is_complete(),
            BodyDecoder::Length(decoder) => decoder.is_complete(),
            BodyDecoder::UntilClose { done } => *done,
        }
    }

    /// True if the body is delimited by the connection closing.
    #[must_use]
    pub fn is_close_delimited(&self) -> bool {
        matches!(self, BodyDecoder::UntilClose { .. })
    }

    /// Trailer headers, once a chunked body has been fully read.
    #[must_use]
    pub fn trailers(&self) -> Option<&HeaderGroup> {
        match self {
            BodyDecoder::Chunked(decoder) if decoder.is_complete() => Some(decoder.trailers()),
            _ => None,
        }
    }
}
