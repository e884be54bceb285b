//! `key=value` directive lists used by DIGEST-MD5 (RFC 2831 section 7.1).

use crate::error::{Error, Result};

/// Ordered directive list with case-insensitive keys.
///
/// A key that appears more than once keeps its first position and its
/// values are joined with commas, so `realm="a",realm="b"` reads as
/// `realm` = `a,b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    entries: Vec<(String, String)>,
}

impl Directives {
    /// Parses a comma-separated directive list.
    ///
    /// Values may be bare tokens or quoted strings with backslash escapes.
    /// Empty list elements are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] for a directive without `=` or an
    /// unterminated quoted string.
    pub fn parse(input: &str) -> Result<Self> {
        let mut directives = Self::default();
        let mut rest = input;

        loop {
            rest = rest.trim_start_matches(|c: char| c == ',' || c.is_ascii_whitespace());
            if rest.is_empty() {
                return Ok(directives);
            }

            let (key, after_key) = rest
                .split_once('=')
                .ok_or_else(|| Error::auth(format!("directive without value: {rest}")))?;
            let key = key.trim();
            if key.is_empty() || key.contains(',') {
                return Err(Error::auth(format!("malformed directive: {rest}")));
            }

            let after_key = after_key.trim_start();
            let (value, remainder) = if let Some(quoted) = after_key.strip_prefix('"') {
                read_quoted(quoted)?
            } else {
                let end = after_key.find(',').unwrap_or(after_key.len());
                (after_key[..end].trim().to_string(), &after_key[end..])
            };

            directives.fold(key, value);
            rest = remainder;
        }
    }

    /// Adds a value, comma-joining it onto an existing key.
    pub fn fold(&mut self, key: &str, value: String) {
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
        {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&value);
            }
            None => self.entries.push((key.to_ascii_lowercase(), value)),
        }
    }

    /// Returns the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over keys (lowercased) and values in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no directives.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads a quoted string body; `input` starts after the opening quote.
fn read_quoted(input: &str) -> Result<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &input[i + 1..])),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c => value.push(c),
        }
    }

    Err(Error::auth("unterminated quoted string"))
}

/// Builds a directive list for a client response.
#[derive(Debug, Default)]
pub struct DirectiveWriter {
    out: String,
}

impl DirectiveWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { out: String::new() }
    }

    /// Appends `key="value"`, escaping quotes and backslashes.
    pub fn quoted(&mut self, key: &str, value: &str) -> &mut Self {
        self.separator();
        self.out.push_str(key);
        self.out.push_str("=\"");
        for c in value.chars() {
            if matches!(c, '"' | '\\') {
                self.out.push('\\');
            }
            self.out.push(c);
        }
        self.out.push('"');
        self
    }

    /// Appends `key=value` without quoting.
    pub fn bare(&mut self, key: &str, value: &str) -> &mut Self {
        self.separator();
        self.out.push_str(key);
        self.out.push('=');
        self.out.push_str(value);
        self
    }

    /// Returns the directive list.
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn separator(&mut self) {
        if !self.out.is_empty() {
            self.out.push(',');
        }
    }
}
