//! Ordered, case-preserving header storage
//!
//! `http::HeaderMap` normalizes names and cannot tell a header the engine
//! generated from one the caller set, so request and response heads are kept
//! in a `HeaderGroup` instead. Lookups are case-insensitive; insertion order
//! and original spelling are preserved on the wire.

use std::fmt;

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
    auto_generated: bool,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            auto_generated: false,
        }
    }

    /// A header produced by the engine rather than the caller.
    ///
    /// Auto-generated headers are replaced on every attempt; user headers are not.
    pub fn auto(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            auto_generated: true,
            ..Self::new(name, value)
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }

    /// True if this header's name equals `name`, ignoring ASCII case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Parse the value as a comma-separated list of elements.
    #[must_use]
    pub fn elements(&self) -> Vec<HeaderElement> {
        HeaderElement::parse_all(&self.value)
    }

    pub(crate) fn append_folded(&mut self, continuation: &str) {
        if !self.value.is_empty() {
            self.value.push(' ');
        }
        self.value.push_str(continuation);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// A `name=value` pair inside a header element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValuePair {
    pub name: String,
    pub value: Option<String>,
}

/// One comma-separated element of a header value, such as `chunked` in
/// `Transfer-Encoding: gzip, chunked` or `close` in `Connection: close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderElement {
    pub name: String,
    pub value: Option<String>,
    pub params: Vec<NameValuePair>,
}

impl HeaderElement {
    /// Split a header value into its elements, honoring quoted strings.
    #[must_use]
    pub fn parse_all(value: &str) -> Vec<HeaderElement> {
        split_unquoted(value, ',')
            .into_iter()
            .filter_map(|raw| {
                let mut parts = split_unquoted(raw, ';').into_iter();
                let first = parse_pair(parts.next()?)?;
                Some(HeaderElement {
                    name: first.name,
                    value: first.value,
                    params: parts.filter_map(parse_pair).collect(),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.value.as_deref())
    }
}

pub(crate) fn parse_pair(raw: &str) -> Option<NameValuePair> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(match raw.split_once('=') {
        Some((name, value)) => NameValuePair {
            name: name.trim().to_string(),
            value: Some(unquote(value.trim()).to_string()),
        },
        None => NameValuePair {
            name: raw.to_string(),
            value: None,
        },
    })
}

pub(crate) fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

pub(crate) fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// An ordered list of headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderGroup {
    headers: Vec<Header>,
}

impl HeaderGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    pub fn add(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// Append a caller header without touching existing ones.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.add(Header::new(name, value));
    }

    /// Replace every header named like `header` with it.
    pub fn set(&mut self, header: Header) {
        self.remove(header.name());
        self.add(header);
    }

    /// Remove all headers with this name and return how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|h| !h.is(name));
        before - self.headers.len()
    }

    /// Remove engine-generated headers with this name, leaving caller ones.
    pub fn remove_auto_generated(&mut self, name: &str) {
        self.headers
            .retain(|h| !(h.is(name) && h.is_auto_generated()));
    }

    #[must_use]
    pub fn first(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.is(name))
    }

    #[must_use]
    pub fn last(&self, name: &str) -> Option<&Header> {
        self.headers.iter().rev().find(|h| h.is(name))
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Header> + 'a {
        self.headers.iter().filter(move |h| h.is(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    /// All values of `name` joined with `", "`, as one logical header.
    #[must_use]
    pub fn condensed(&self, name: &str) -> Option<Header> {
        let mut matching = self.all(name);
        let first = matching.next()?;
        let mut combined = first.clone();
        for next in matching {
            combined.value.push_str(", ");
            combined.value.push_str(next.value());
        }
        Some(combined)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.headers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Header> {
        self.headers.last_mut()
    }
}

impl<'a> IntoIterator for &'a HeaderGroup {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}

impl FromIterator<Header> for HeaderGroup {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self {
            headers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_keep_order() {
        let mut group = HeaderGroup::new();
        group.append("Set-Cookie", "a=1");
        group.append("content-type", "text/plain");
        group.append("set-cookie", "b=2");

        assert_eq!(group.first("CONTENT-TYPE").map(Header::value), Some("text/plain"));
        let cookies: Vec<_> = group.all("Set-Cookie").map(Header::value).collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert_eq!(
            group.condensed("set-cookie").map(|h| h.value().to_string()),
            Some("a=1, b=2".to_string())
        );
    }

    #[test]
    fn removing_auto_generated_keeps_user_headers() {
        let mut group = HeaderGroup::new();
        group.add(Header::auto("Authorization", "Basic Zm9vOmJhcg=="));
        group.append("Authorization", "Bearer token");

        group.remove_auto_generated("authorization");
        assert_eq!(group.len(), 1);
        assert_eq!(group.first("Authorization").map(Header::value), Some("Bearer token"));
    }

    #[test]
    fn parses_elements_with_params_and_quotes() {
        let header = Header::new(
            "Content-Type",
            "text/html; charset=\"utf-8\", application/json;q=0.5",
        );
        let elements = header.elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].name, "text/html");
        assert_eq!(elements[0].param("charset"), Some("utf-8"));
        assert_eq!(elements[1].param("Q"), Some("0.5"));
    }
}
