//! IMAP response records.
//!
//! A [`Response`] classifies one server line up front (continuation, tagged
//! status, untagged status or untagged data) and keeps the rest of the line
//! behind a cursor, so field decoders such as [`FetchItem::parse_all`] can
//! pick up where the classifier stopped.

#![allow(clippy::missing_errors_doc)]

mod body_structure;
mod envelope;
mod fetch;

pub use body_structure::{BodyKind, BodyStructure, Disposition, parse_body_structure};
pub use envelope::{Address, Envelope, parse_envelope};
pub use fetch::{BodyData, FetchItem};

use bytes::Bytes;

use crate::parser::lexer::Lexer;
use crate::types::{Status, Tag};
use crate::{Error, Result};

/// How a response line starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// `+` continuation request.
    Continuation,
    /// Command completion carrying the command's tag.
    Tagged(Tag),
    /// `*` untagged line.
    Untagged,
}

/// One server response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    buffer: Bytes,
    index: usize,
    kind: ResponseKind,
    status: Option<Status>,
    number: Option<u32>,
    key: Option<String>,
}

impl Response {
    /// Parses a complete response line.
    ///
    /// For untagged lines that are not status responses, the first atom is
    /// tried as a number. If it is one, it becomes [`number`](Self::number)
    /// and the following atom is the key; otherwise the atom itself is the key.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] for a malformed status line, [`Error::Truncated`] if
    /// the line ends before the classifying tokens are complete.
    pub fn parse(line: impl Into<Bytes>) -> Result<Self> {
        let buffer: Bytes = line.into();
        let mut lexer = Lexer::new(&buffer);

        let (kind, status, number, key) = match lexer.peek() {
            None => return Err(lexer.truncated()),
            Some(b'+') => {
                lexer.advance();
                if lexer.peek() == Some(b' ') {
                    lexer.advance();
                }
                (ResponseKind::Continuation, None, None, None)
            }
            Some(b'*') => {
                lexer.advance();
                lexer.expect_space()?;
                let word = read_word(&mut lexer)?;
                if let Some(status) = Status::parse(word) {
                    (ResponseKind::Untagged, Some(status), None, None)
                } else if let Ok(n) = word.parse::<u32>() {
                    lexer.expect_space()?;
                    let key = read_word(&mut lexer)?.to_ascii_uppercase();
                    (ResponseKind::Untagged, None, Some(n), Some(key))
                } else {
                    (ResponseKind::Untagged, None, None, Some(word.to_ascii_uppercase()))
                }
            }
            Some(_) => {
                let tag = Tag::new(read_word(&mut lexer)?);
                lexer.expect_space()?;
                let word = read_word(&mut lexer)?;
                let status = Status::parse(word)
                    .ok_or_else(|| lexer.error(&format!("Invalid status in tagged response: {word}")))?;
                (ResponseKind::Tagged(tag), Some(status), None, None)
            }
        };

        let index = lexer.position();

        Ok(Self {
            buffer,
            index,
            kind,
            status,
            number,
            key,
        })
    }

    /// Returns how the line starts.
    #[must_use]
    pub const fn kind(&self) -> &ResponseKind {
        &self.kind
    }

    /// Returns the tag of a tagged response.
    #[must_use]
    pub const fn tag(&self) -> Option<&Tag> {
        match &self.kind {
            ResponseKind::Tagged(tag) => Some(tag),
            _ => None,
        }
    }

    /// Returns the status of a status response.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        self.status
    }

    /// Returns true for a `+` continuation request.
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        matches!(self.kind, ResponseKind::Continuation)
    }

    /// Returns true for a tagged completion.
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        matches!(self.kind, ResponseKind::Tagged(_))
    }

    /// Returns true for an untagged line.
    #[must_use]
    pub const fn is_untagged(&self) -> bool {
        matches!(self.kind, ResponseKind::Untagged)
    }

    /// Returns true if the status is OK.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Some(Status::Ok)
    }

    /// Returns true if the status is NO.
    #[must_use]
    pub fn is_no(&self) -> bool {
        self.status == Some(Status::No)
    }

    /// Returns true if the status is BAD.
    #[must_use]
    pub fn is_bad(&self) -> bool {
        self.status == Some(Status::Bad)
    }

    /// Returns true if the status is BYE.
    #[must_use]
    pub fn is_bye(&self) -> bool {
        self.status == Some(Status::Bye)
    }

    /// Returns the uppercased response key, such as `FETCH`.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Compares the key ignoring case.
    #[must_use]
    pub fn key_equals(&self, key: &str) -> bool {
        self.key
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case(key))
    }

    /// Returns the numeric prefix of an untagged data line.
    #[must_use]
    pub const fn number(&self) -> Option<u32> {
        self.number
    }

    /// Returns the whole line.
    #[must_use]
    pub const fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Returns the cursor position within the line.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the unparsed rest of the line.
    #[must_use]
    pub fn rest(&self) -> &[u8] {
        &self.buffer[self.index..]
    }

    /// Returns the rest of the line as trimmed text without moving the cursor.
    ///
    /// For status responses this is the human-readable text, including any
    /// bracketed response code.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.rest()).trim().to_string()
    }

    /// Returns the byte at the cursor.
    #[must_use]
    pub fn peek_byte(&self) -> Option<u8> {
        self.buffer.get(self.index).copied()
    }

    /// Advances the cursor past spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek_byte() == Some(b' ') {
            self.index += 1;
        }
    }

    /// Reads the next atom, skipping leading spaces.
    ///
    /// Returns `None` if there is no atom at the cursor.
    pub fn read_atom(&mut self) -> Option<String> {
        let start = self.index;
        let atom = self.with_lexer(|lexer| {
            lexer.skip_spaces();
            match lexer.read_raw_atom() {
                Ok(atom) if !atom.is_empty() => Some(atom.to_string()),
                _ => None,
            }
        });
        if atom.is_none() {
            self.index = start;
        }
        atom
    }

    /// Reads the next number, skipping leading spaces.
    pub fn read_number(&mut self) -> Option<u32> {
        let start = self.index;
        self.skip_spaces();
        let digits = self.rest().iter().take_while(|b| b.is_ascii_digit()).count();
        let parsed = std::str::from_utf8(&self.rest()[..digits])
            .ok()
            .and_then(|s| s.parse().ok());
        if parsed.is_some() {
            self.index += digits;
        } else {
            self.index = start;
        }
        parsed
    }

    /// Reads a parenthesized list of atoms.
    ///
    /// Returns `None`, leaving the cursor where it was, if the cursor (after
    /// spaces) is not at `(`. An empty list `()` is consumed and also yields
    /// `None`.
    pub fn read_simple_list(&mut self) -> Option<Vec<String>> {
        self.with_lexer(|lexer| lexer.read_simple_list())
    }

    /// Runs a field decoder over the rest of the line and advances the cursor
    /// by whatever the decoder consumed.
    pub fn with_lexer<T>(&mut self, f: impl FnOnce(&mut Lexer<'_>) -> T) -> T {
        let rest = &self.buffer[self.index..];
        let mut lexer = Lexer::new(rest);
        let out = f(&mut lexer);
        let consumed = lexer.position();
        self.index += consumed;
        out
    }
}

/// Reads a non-empty atom, reporting truncation at end of input.
fn read_word<'a>(lexer: &mut Lexer<'a>) -> Result<&'a str> {
    let word = lexer.read_raw_atom()?;
    if !word.is_empty() {
        return Ok(word);
    }
    if lexer.is_eof() {
        Err(lexer.truncated())
    } else {
        Err(Error::Parse {
            position: lexer.position(),
            message: "Expected atom".to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_untagged_number_and_key() {
        let r = Response::parse(&b"* 12 FETCH (FLAGS (\\Seen))\r\n"[..]).unwrap();
        assert!(r.is_untagged());
        assert_eq!(r.number(), Some(12));
        assert_eq!(r.key(), Some("FETCH"));
        assert!(r.status().is_none());
    }

    #[test]
    fn test_untagged_key_without_number() {
        let r = Response::parse(&b"* capability IMAP4rev1 LITERAL+\r\n"[..]).unwrap();
        assert_eq!(r.number(), None);
        assert_eq!(r.key(), Some("CAPABILITY"));
        assert!(r.key_equals("Capability"));
    }

    #[test]
    fn test_oversized_number_is_key() {
        let r = Response::parse(&b"* 99999999999 EXISTS\r\n"[..]).unwrap();
        assert_eq!(r.number(), None);
        assert_eq!(r.key(), Some("99999999999"));
    }

    #[test]
    fn test_untagged_status() {
        let r = Response::parse(&b"* BYE server shutting down\r\n"[..]).unwrap();
        assert!(r.is_bye());
        assert_eq!(r.key(), None);
        assert_eq!(r.text(), "server shutting down");
    }

    #[test]
    fn test_tagged_status() {
        let r = Response::parse(&b"A0001 NO [ALERT] no such part\r\n"[..]).unwrap();
        assert!(r.is_tagged());
        assert!(r.is_no());
        assert_eq!(r.tag().unwrap().as_str(), "A0001");
        assert_eq!(r.text(), "[ALERT] no such part");
    }

    #[test]
    fn test_continuation() {
        let r = Response::parse(&b"+ go ahead\r\n"[..]).unwrap();
        assert!(r.is_continuation());
        assert_eq!(r.text(), "go ahead");
    }

    #[test]
    fn test_malformed_tagged_status_is_syntax_error() {
        let err = Response::parse(&b"A0001 MAYBE\r\n"[..]).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = Response::parse(&b"* (x)\r\n"[..]).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_truncated_lines() {
        assert!(matches!(Response::parse(&b""[..]), Err(Error::Truncated { .. })));
        assert!(matches!(Response::parse(&b"*"[..]), Err(Error::Truncated { .. })));
        assert!(matches!(Response::parse(&b"* 12"[..]), Err(Error::Truncated { .. })));
        assert!(matches!(Response::parse(&b"A0001"[..]), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_read_simple_list_cases() {
        let mut r = Response::parse(&b"* FLAGS (a b c)\r\n"[..]).unwrap();
        assert_eq!(
            r.read_simple_list(),
            Some(vec!["a".into(), "b".into(), "c".into()])
        );

        let mut r = Response::parse(&b"* FLAGS ()\r\n"[..]).unwrap();
        assert_eq!(r.read_simple_list(), None);

        let mut r = Response::parse(&b"* FLAGS abc\r\n"[..]).unwrap();
        let before = r.index();
        assert_eq!(r.read_simple_list(), None);
        assert_eq!(r.index(), before);
    }

    #[test]
    fn test_read_atom_and_number() {
        let mut r = Response::parse(&b"* 3 EXPUNGE extra 42\r\n"[..]).unwrap();
        assert_eq!(r.read_atom().as_deref(), Some("extra"));
        assert_eq!(r.read_number(), Some(42));
        assert_eq!(r.read_number(), None);
        assert_eq!(r.read_atom(), None);
    }

    proptest! {
        #[test]
        fn leading_number_becomes_sequence_number(n in any::<u32>(), key in "[A-Z]{1,10}") {
            let line = format!("* {n} {key}\r\n");
            let r = Response::parse(line.into_bytes()).unwrap();
            prop_assert_eq!(r.number(), Some(n));
            prop_assert_eq!(r.key(), Some(key.as_str()));
        }

        #[test]
        fn leading_word_becomes_key(key in "[A-Za-z][A-Za-z0-9.]{0,10}") {
            prop_assume!(Status::parse(&key).is_none());
            let line = format!("* {key} rest\r\n");
            let r = Response::parse(line.into_bytes()).unwrap();
            prop_assert_eq!(r.number(), None);
            let upper = key.to_ascii_uppercase();
            prop_assert_eq!(r.key(), Some(upper.as_str()));
        }
    }
}
