//! Line and header-block reading
//!
//! Heads are decoded as ISO-8859-1 so any byte sequence survives; values that
//! are really UTF-8 are left for callers to reinterpret.

use std::io::{self, BufRead};

use super::headers::{Header, HeaderGroup};

pub(crate) const WIRE: &str = "tether::wire";

/// Build the error used for framing violations in the byte stream.
pub(crate) fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Read one CRLF- or LF-terminated line without its terminator.
///
/// Returns `Ok(None)` if the stream is at end of input.
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut raw = Vec::new();
    if reader.read_until(b'\n', &mut raw)? == 0 {
        return Ok(None);
    }
    if raw.last() == Some(&b'\n') {
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
    }
    let line: String = raw.iter().map(|&b| char::from(b)).collect();
    tracing::trace!(target: WIRE, "<< {line:?}");
    Ok(Some(line))
}

/// Read a header block up to and including the terminating blank line.
///
/// Continuation lines starting with a space or tab are folded into the
/// preceding header. End of input also terminates the block.
pub fn parse_headers<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<HeaderGroup> {
    let mut headers = HeaderGroup::new();
    while let Some(line) = read_line(reader)? {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(previous) = headers.last_mut() {
                previous.append_folded(line.trim());
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(invalid_data(format!("unable to parse header: {line}")));
        };
        headers.add(Header::new(name.trim(), value.trim()));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reads_lines_with_either_terminator() {
        let mut input = Cursor::new(b"first\r\nsecond\nlast".to_vec());
        assert_eq!(read_line(&mut input).ok().flatten().as_deref(), Some("first"));
        assert_eq!(read_line(&mut input).ok().flatten().as_deref(), Some("second"));
        assert_eq!(read_line(&mut input).ok().flatten().as_deref(), Some("last"));
        assert!(matches!(read_line(&mut input), Ok(None)));
    }

    #[test]
    fn folds_continuation_lines() {
        let mut input = Cursor::new(
            b"X-Long: part one\r\n\t part two\r\nHost: example.com\r\n\r\nbody".to_vec(),
        );
        let headers = parse_headers(&mut input).expect("headers parse");
        assert_eq!(
            headers.first("x-long").map(Header::value),
            Some("part one part two")
        );
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn header_without_colon_is_invalid() {
        let mut input = Cursor::new(b"NotAHeader\r\n\r\n".to_vec());
        let err = parse_headers(&mut input).expect_err("must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
