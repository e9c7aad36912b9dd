//! Response status line

use std::fmt;
use std::io;

use super::parser::invalid_data;
use super::version::HttpVersion;

/// A parsed `HTTP/<version> <code> <reason>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    raw: String,
    version: HttpVersion,
    status_code: u16,
    reason: String,
    ambiguous: bool,
}

impl StatusLine {
    /// True if the line, after leading whitespace, begins with `HTTP`.
    #[must_use]
    pub fn starts_with_http(line: &str) -> bool {
        line.trim_start().starts_with("HTTP")
    }

    /// Parse a status line.
    ///
    /// A bare `HTTP` version token is ambiguous; it is read as HTTP/1.0 unless
    /// `unambiguous` is set, in which case it is rejected.
    pub fn parse(line: &str, unambiguous: bool) -> io::Result<StatusLine> {
        let trimmed = line.trim_start();
        if !trimmed.starts_with("HTTP") {
            return Err(invalid_data(format!(
                "status line '{line}' does not start with HTTP"
            )));
        }
        let (version_token, rest) = trimmed.split_once(' ').ok_or_else(|| {
            invalid_data(format!("unable to parse HTTP version from status line '{line}'"))
        })?;
        let rest = rest.trim_start_matches(' ');
        let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));

        let status_code = code
            .parse::<u16>()
            .ok()
            .filter(|c| (100..1000).contains(c))
            .ok_or_else(|| invalid_data(format!("unable to parse status code from status line '{line}'")))?;

        let version_token = version_token.to_ascii_uppercase();
        let (version, ambiguous) = if version_token == "HTTP" && !unambiguous {
            tracing::warn!("ambiguous status line (HTTP protocol version missing): {line}");
            (HttpVersion::HTTP_1_0, true)
        } else {
            let version = version_token
                .parse::<HttpVersion>()
                .map_err(|e| invalid_data(e.to_string()))?;
            (version, false)
        };

        Ok(StatusLine {
            raw: line.to_string(),
            version,
            status_code,
            reason: reason.trim().to_string(),
            ambiguous,
        })
    }

    /// Build a status line the way a server would have sent it.
    #[must_use]
    pub fn synthetic(version: HttpVersion, status_code: u16, reason: &str) -> StatusLine {
        StatusLine {
            raw: format!("{version} {status_code} {reason}"),
            version,
            status_code,
            reason: reason.to_string(),
            ambiguous: false,
        }
    }

    #[must_use]
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// The registered reason for this code, independent of what the server sent.
    #[must_use]
    pub fn canonical_reason(&self) -> Option<&'static str> {
        http::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|code| code.canonical_reason())
    }

    /// True if the version was missing and assumed to be HTTP/1.0.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    #[must_use]
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status_code)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_status_line() {
        let line = StatusLine::parse("HTTP/1.1 404 Not Found", false).expect("valid");
        assert_eq!(line.version(), HttpVersion::HTTP_1_1);
        assert_eq!(line.status_code(), 404);
        assert_eq!(line.reason_phrase(), "Not Found");
        assert_eq!(line.canonical_reason(), Some("Not Found"));
    }

    #[test]
    fn reason_phrase_is_optional() {
        let line = StatusLine::parse("  HTTP/1.0 200", false).expect("valid");
        assert_eq!(line.status_code(), 200);
        assert_eq!(line.reason_phrase(), "");
    }

    #[test]
    fn missing_version_is_lenient_unless_unambiguous() {
        let lenient = StatusLine::parse("HTTP 200 OK", false).expect("lenient parse");
        assert_eq!(lenient.version(), HttpVersion::HTTP_1_0);
        assert!(lenient.is_ambiguous());

        assert!(StatusLine::parse("HTTP 200 OK", true).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(StatusLine::parse("garbage", false).is_err());
        assert!(StatusLine::parse("HTTP/1.1 abc OK", false).is_err());
        assert!(StatusLine::parse("HTTP/1.1", false).is_err());
        assert!(!StatusLine::starts_with_http("<html>"));
    }
}
