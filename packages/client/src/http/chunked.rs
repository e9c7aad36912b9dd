//! Chunked transfer coding
//!
//! `ChunkedDecoder` is a resumable state machine that pulls from whatever
//! `BufRead` it is handed on each call, so the connection can stay owned by
//! the pool guard while the body is streamed. `ChunkedWriter` frames an
//! outgoing body.

use std::io::{self, BufRead, Write};

use super::headers::HeaderGroup;
use super::parser::{invalid_data, parse_headers, read_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data { remaining: u64 },
    DataEnd,
    Trailers,
    Done,
}

/// Decoder for a `Transfer-Encoding: chunked` body.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkState,
    trailers: HeaderGroup,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
            trailers: HeaderGroup::new(),
        }
    }

    /// True once the last chunk and the trailer block have been consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Trailer headers sent after the last chunk.
    #[must_use]
    pub fn trailers(&self) -> &HeaderGroup {
        &self.trailers
    }

    /// Decode body bytes from `src` into `buf`. Returns 0 at end of body.
    pub fn read<R: BufRead + ?Sized>(&mut self, src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.state {
                ChunkState::Size => {
                    let line = read_line(src)?.ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "chunked stream ended unexpectedly",
                        )
                    })?;
                    let size = parse_chunk_size(&line)?;
                    self.state = if size == 0 {
                        ChunkState::Trailers
                    } else {
                        ChunkState::Data { remaining: size }
                    };
                }
                ChunkState::Data { remaining } => {
                    if buf.is_empty() {
                        return Ok(0);
                    }
                    let available = src.fill_buf()?;
                    if available.is_empty() {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "chunked stream ended inside a chunk",
                        ));
                    }
                    let n = available
                        .len()
                        .min(buf.len())
                        .min(usize::try_from(remaining).unwrap_or(usize::MAX));
                    buf[..n].copy_from_slice(&available[..n]);
                    src.consume(n);
                    let remaining = remaining - n as u64;
                    self.state = if remaining == 0 {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::Data { remaining }
                    };
                    return Ok(n);
                }
                ChunkState::DataEnd => {
                    match read_line(src)? {
                        Some(line) if line.is_empty() => {}
                        Some(_) => return Err(invalid_data("chunk data not followed by CRLF")),
                        None => {
                            return Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "chunked stream ended after chunk data",
                            ));
                        }
                    }
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailers => {
                    self.trailers = parse_headers(src)?;
                    self.state = ChunkState::Done;
                }
                ChunkState::Done => return Ok(0),
            }
        }
    }
}

fn parse_chunk_size(line: &str) -> io::Result<u64> {
    let digits = line.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(digits, 16)
        .map_err(|_| invalid_data(format!("bad chunk size: {line:?}")))
}

/// Writer that frames everything written to it as chunks.
///
/// [`ChunkedWriter::finish`] must be called to emit the terminating chunk.
#[derive(Debug)]
pub struct ChunkedWriter<W: Write> {
    inner: W,
}

impl<W: Write> ChunkedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write the zero-size chunk and an empty trailer block.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.write_all(b"0\r\n\r\n")?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ChunkedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        write!(self.inner, "{:x}\r\n", buf.len())?;
        self.inner.write_all(buf)?;
        self.inner.write_all(b"\r\n")?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
