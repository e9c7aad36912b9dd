//! HTTP protocol version

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An `HTTP/<major>.<minor>` protocol version.
///
/// Versions order numerically, so `HTTP/1.0 < HTTP/1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HttpVersion {
    major: u8,
    minor: u8,
}

/// Error returned when a protocol version string is malformed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid HTTP version: {0:?}")]
pub struct ParseVersionError(String);

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_1_1: HttpVersion = HttpVersion { major: 1, minor: 1 };

    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub const fn major(&self) -> u8 {
        self.major
    }

    #[must_use]
    pub const fn minor(&self) -> u8 {
        self.minor
    }

    /// True for HTTP/1.1 and later.
    #[must_use]
    pub fn is_persistent_by_default(&self) -> bool {
        *self >= Self::HTTP_1_1
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_1_1
    }
}

impl FromStr for HttpVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let rest = s.trim().strip_prefix("HTTP/").ok_or_else(err)?;
        let (major, minor) = rest.split_once('.').ok_or_else(err)?;
        let major = major.parse::<u8>().map_err(|_| err())?;
        let minor = minor.parse::<u8>().map_err(|_| err())?;
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for HttpVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpVersion> for String {
    fn from(version: HttpVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
