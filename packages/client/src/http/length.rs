//! Content-Length delimited bodies

use std::io::{self, BufRead};

/// Decoder that yields exactly `length` bytes, then end of body.
///
/// Bytes the peer sent past the declared length stay in the source buffer;
/// the connection layer treats them as a reason to close.
#[derive(Debug, Clone, Copy)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    #[must_use]
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn read<R: BufRead + ?Sized>(&mut self, src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let available = src.fill_buf()?;
        if available.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "premature end of Content-Length delimited body ({} bytes missing)",
                    self.remaining
                ),
            ));
        }
        let n = available
            .len()
            .min(buf.len())
            .min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        buf[..n].copy_from_slice(&available[..n]);
        src.consume(n);
        self.remaining -= n as u64;
        Ok(n)
    }
}
