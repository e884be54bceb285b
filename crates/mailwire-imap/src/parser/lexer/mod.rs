//! IMAP lexer for tokenizing server responses.
//!
//! This module implements a lexer for the IMAP protocol grammar defined in RFC 9051.
//! It breaks raw bytes into tokens that the parser can process. Running out of
//! input in the middle of a token is reported as [`Error::Truncated`]; any other
//! malformed input is an [`Error::Parse`].

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// IMAP lexer state.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns true if only a line terminator (or nothing) is left.
    #[must_use]
    pub fn at_line_end(&self) -> bool {
        matches!(self.remaining(), [] | [b'\r', b'\n'] | [b'\n'])
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peeks at the byte at offset from current position.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Skips n bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            // CRLF
            b'\r' => match self.peek_at(1) {
                Some(b'\n') => {
                    self.skip(2);
                    Ok(Token::Crlf)
                }
                None => Err(self.truncated()),
                Some(_) => Err(self.error("Expected LF after CR")),
            },

            // Bare LF is tolerated as a line end
            b'\n' => {
                self.advance();
                Ok(Token::Crlf)
            }

            b' ' => {
                self.advance();
                Ok(Token::Space)
            }

            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            b'[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            b']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            b'*' => {
                self.advance();
                Ok(Token::Asterisk)
            }
            b'+' => {
                self.advance();
                Ok(Token::Plus)
            }

            b'"' => self.read_quoted_string(),

            b'{' => self.read_literal_prefix(),

            b'0'..=b'9' => self.read_number_or_atom(),

            _ if is_atom_char(byte) => self.read_atom(),

            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    /// Reads a quoted string token.
    ///
    /// Content that is not valid UTF-8 is read as ISO-8859-1.
    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance(); // Skip opening quote

        let mut result = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => result.push(c),
                    Some(c) => {
                        return Err(self.error(&format!("Invalid escape: \\{}", char::from(c))));
                    }
                    None => return Err(self.truncated()),
                },
                Some(b'\r' | b'\n') => {
                    return Err(self.error("Line break inside quoted string"));
                }
                Some(c) => result.push(c),
                None => return Err(self.truncated()),
            }
        }

        let s = String::from_utf8(result)
            .unwrap_or_else(|e| mailwire_mime::encoding::decode_latin1(e.as_bytes()));

        Ok(Token::QuotedString(s))
    }

    /// Reads a literal size prefix {n} and its data.
    fn read_literal_prefix(&mut self) -> Result<Token<'a>> {
        self.advance(); // Skip {

        let start = self.pos;
        let mut literal_plus = false;

        loop {
            match self.peek() {
                Some(b'0'..=b'9') => {
                    self.advance();
                }
                Some(b'+') => {
                    literal_plus = true;
                    self.advance();
                }
                Some(b'}') => break,
                None => return Err(self.truncated()),
                Some(_) => return Err(self.error("Invalid character in literal size")),
            }
        }

        let size_str = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("Invalid literal size"))?
            .trim_end_matches('+');

        let size: usize = size_str
            .parse()
            .map_err(|_| self.error("Invalid literal size number"))?;

        self.advance(); // Skip }

        if literal_plus {
            if self.peek() == Some(b'\r') && self.peek_at(1) == Some(b'\n') {
                self.skip(2);
            }
        } else {
            match (self.advance(), self.advance()) {
                (Some(b'\r'), Some(b'\n')) => {}
                (None, _) | (Some(b'\r'), None) => return Err(self.truncated()),
                _ => return Err(self.error("Expected CRLF after literal size")),
            }
        }

        if self.pos + size > self.input.len() {
            return Err(Error::Truncated {
                position: self.input.len(),
            });
        }

        let data = self.input[self.pos..self.pos + size].to_vec();
        self.skip(size);

        Ok(Token::Literal(data))
    }

    /// Reads a number or atom starting with a digit.
    fn read_number_or_atom(&mut self) -> Result<Token<'a>> {
        let s = self.read_raw_atom()?;

        if s.bytes().all(|b| b.is_ascii_digit()) {
            let n: u32 = s.parse().map_err(|_| self.error("Number too large"))?;
            Ok(Token::Number(n))
        } else {
            Ok(Token::Atom(s))
        }
    }

    /// Reads an atom token.
    fn read_atom(&mut self) -> Result<Token<'a>> {
        let s = self.read_raw_atom()?;

        if s.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(s))
        }
    }

    /// Reads the run of atom characters at the cursor without classifying it.
    ///
    /// Returns an empty string if the cursor is not on an atom character.
    pub fn read_raw_atom(&mut self) -> Result<&'a str> {
        let start = self.pos;

        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }

        std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("Invalid UTF-8 in atom"))
    }

    /// Creates a parse error at the current position.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Creates a truncation error at the current position.
    pub(crate) const fn truncated(&self) -> Error {
        Error::Truncated { position: self.pos }
    }

    /// Builds the error for an unexpected token.
    pub(crate) fn unexpected(&self, expected: &str, token: &Token<'_>) -> Error {
        if matches!(token, Token::Eof) {
            self.truncated()
        } else {
            self.error(&format!("Expected {expected}, got {token:?}"))
        }
    }

    /// Expects and consumes a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("{expected:?}"), &token))
        }
    }

    /// Expects and consumes a space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an astring (atom or string).
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(literal_to_string(data)),
            token => Err(self.unexpected("astring", &token)),
        }
    }

    /// Reads a nstring (NIL or string).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(literal_to_string(data))),
            token => Err(self.unexpected("nstring", &token)),
        }
    }

    /// Reads a nstring, also accepting a bare atom or number.
    ///
    /// Some servers send unquoted values where the grammar asks for strings.
    pub fn read_nstring_lenient(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(literal_to_string(data))),
            Token::Atom(s) => Ok(Some(s.to_string())),
            Token::Number(n) => Ok(Some(n.to_string())),
            token => Err(self.unexpected("nstring", &token)),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.unexpected("number", &token)),
        }
    }

    /// Reads a number, treating NIL as absent.
    pub fn read_optional_number(&mut self) -> Result<Option<u32>> {
        match self.next_token()? {
            Token::Number(n) => Ok(Some(n)),
            Token::Nil => Ok(None),
            token => Err(self.unexpected("number", &token)),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.unexpected("atom", &token)),
        }
    }

    /// Reads a parenthesized list of space-separated atoms.
    ///
    /// Leading spaces are skipped. Returns `None` without moving the cursor
    /// if the next byte is not `(` or the list is not terminated; returns
    /// `None` after consuming the list if it holds no atoms.
    pub fn read_simple_list(&mut self) -> Option<Vec<String>> {
        let saved = self.pos;
        self.skip_spaces();

        if self.peek() != Some(b'(') {
            self.pos = saved;
            return None;
        }

        let body_start = self.pos + 1;
        let Some(len) = self.input[body_start..].iter().position(|&b| b == b')') else {
            self.pos = saved;
            return None;
        };
        let body = &self.input[body_start..body_start + len];
        self.pos = body_start + len + 1;

        let items: Vec<String> = body
            .split(|&b| b == b' ')
            .filter(|item| !item.is_empty())
            .map(|item| String::from_utf8_lossy(item).into_owned())
            .collect();

        if items.is_empty() { None } else { Some(items) }
    }

    /// Skips optional spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.advance();
        }
    }
}

/// Converts literal bytes to text, reading non-UTF-8 data as ISO-8859-1.
fn literal_to_string(data: Vec<u8>) -> String {
    String::from_utf8(data).unwrap_or_else(|e| mailwire_mime::encoding::decode_latin1(e.as_bytes()))
}

/// Returns true if the byte is a valid atom character.
///
/// Note: This includes `\` to handle flags like `\Seen` as single tokens,
/// even though RFC 9051 technically defines `\` as a quoted-special.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    // atom-specials = "(" / ")" / "{" / SP / CTL / list-wildcards / quoted-specials / resp-specials
    matches!(b,
        0x21..=0x27 |  // ! " # $ % & '  (but not " which is 0x22)
        0x2B..=0x5A |  // + , - . / 0-9 : ; < = > ? @ A-Z
        0x5C |         // \ (for flags like \Seen)
        0x5E..=0x7A |  // ^ _ ` a-z
        0x7C |         // |
        0x7E           // ~
    ) && b != b'"'
        && b != b'%'
}
