//! MIME header handling.

use crate::encoding::{decode_latin1, decode_text};
use crate::error::Result;
use std::fmt;

/// A single header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    /// Creates a header field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Field name as it appeared on the wire.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unfolded field value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the field rendered as a single `Name: value` line.
    #[must_use]
    pub fn line(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }

    fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn is_any_of(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.is_named(name))
    }
}

/// Ordered collection of header fields.
///
/// Field order is preserved and lookups ignore ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<Header>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Appends a header field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push(Header::new(name, value));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is_named(name))
            .map(Header::value)
    }

    /// Gets all values for a header, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.is_named(name))
            .map(Header::value)
            .collect()
    }

    /// Returns all header fields in order.
    #[must_use]
    pub fn all(&self) -> &[Header] {
        &self.headers
    }

    /// Returns the fields whose name is in `names`.
    #[must_use]
    pub fn matching(&self, names: &[&str]) -> Vec<&Header> {
        self.headers.iter().filter(|h| h.is_any_of(names)).collect()
    }

    /// Returns the fields whose name is not in `names`.
    #[must_use]
    pub fn non_matching(&self, names: &[&str]) -> Vec<&Header> {
        self.headers.iter().filter(|h| !h.is_any_of(names)).collect()
    }

    /// Replaces every field called `name` with a single field.
    ///
    /// The new field takes the position of the first one removed, or goes
    /// last if there was none.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let header = Header::new(name, value);
        let position = self.headers.iter().position(|h| h.is_named(&header.name));
        self.headers.retain(|h| !h.is_named(&header.name));
        let index = position.unwrap_or(self.headers.len());
        self.headers.insert(index, header);
    }

    /// Removes every field called `name`.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|h| !h.is_named(name));
    }

    /// Returns every field as a `Name: value` line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.headers.iter().map(Header::line).collect()
    }

    /// Number of fields.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Parses a raw header block.
    ///
    /// Bytes that are not valid UTF-8 are read as ISO-8859-1. Parsing stops
    /// at the first empty line.
    #[must_use]
    pub fn parse_bytes(raw: &[u8]) -> Self {
        match std::str::from_utf8(raw) {
            Ok(text) => Self::parse(text),
            Err(_) => Self::parse(&decode_latin1(raw)),
        }
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    /// Continuation: line
    ///  folded onto the previous field
    /// ```
    ///
    /// A line that is neither a field nor a continuation is skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim());
            }

            let Some((name, value)) = line.split_once(':') else {
                tracing::debug!(line, "skipping malformed header line");
                continue;
            };
            current = Some((name.trim().to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim());
        }

        headers
    }

    /// Decodes a header value containing RFC 2047 encoded-words.
    ///
    /// # Errors
    ///
    /// Returns an error if an encoded-word is malformed.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_text(value)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for header in &self.headers {
            write!(f, "{}: {}\r\n", header.name, header.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_keep_order_and_duplicates() {
        let mut headers = Headers::new();
        headers.add("Received", "a");
        headers.add("Subject", "hi");
        headers.add("Received", "b");

        assert_eq!(headers.get_all("received"), vec!["a", "b"]);
        let names: Vec<_> = headers.all().iter().map(Header::name).collect();
        assert_eq!(names, vec!["Received", "Subject", "Received"]);
    }

    #[test]
    fn test_set_and_remove() {
        let mut headers = Headers::new();
        headers.add("Received", "a");
        headers.add("Subject", "old");
        headers.add("subject", "older");
        headers.add("X-Other", "1");

        headers.set("Subject", "new");
        assert_eq!(headers.get_all("subject"), vec!["new"]);
        assert_eq!(headers.all()[1].name(), "Subject");

        headers.set("Content-ID", "<x@y>");
        assert_eq!(headers.all().last().map(Header::value), Some("<x@y>"));

        headers.remove("received");
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Received"), None);
    }

    #[test]
    fn test_matching_and_non_matching() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        headers.add("Content-ID", "<a@b>");
        headers.add("X-Other", "1");

        let names = ["content-type", "CONTENT-ID"];
        let matched: Vec<_> = headers.matching(&names).into_iter().map(Header::name).collect();
        assert_eq!(matched, vec!["Content-Type", "Content-ID"]);

        let rest: Vec<_> = headers
            .non_matching(&names)
            .into_iter()
            .map(Header::line)
            .collect();
        assert_eq!(rest, vec!["X-Other: 1".to_string()]);
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("body").is_none());
    }

    #[test]
    fn test_headers_parse_skips_garbage_lines() {
        let headers = Headers::parse(concat!(
            "Content-Type: text/plain\r\n",
            "not a header line\r\n",
            "Content-ID: <a@b>\r\n",
            "\r\n"
        ));
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("content-id"), Some("<a@b>"));
        assert!(Headers::parse("junk only\r\n").is_empty());
    }

    #[test]
    fn test_headers_parse_bytes_latin1_fallback() {
        let raw = b"Content-Description: caf\xe9\r\n\r\n";
        let headers = Headers::parse_bytes(raw);
        assert_eq!(headers.get("content-description"), Some("caf\u{e9}"));
    }

    #[test]
    fn test_headers_display_uses_crlf() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        headers.add("Content-Transfer-Encoding", "7bit");

        assert_eq!(
            headers.to_string(),
            "Content-Type: text/plain\r\nContent-Transfer-Encoding: 7bit\r\n"
        );
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(
            Headers::decode_value("=?utf-8?Q?caf=C3=A9?=").unwrap(),
            "caf\u{e9}"
        );
    }
}
