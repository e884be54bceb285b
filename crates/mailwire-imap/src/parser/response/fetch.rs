//! FETCH response items.

use bytes::Bytes;

use super::Response;
use super::body_structure::{BodyStructure, parse_body_structure};
use super::envelope::{Envelope, parse_envelope};
use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::{Error, Result};

/// Section data returned by `BODY[section]<origin>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyData {
    /// Section specifier as echoed by the server; empty for the whole message.
    pub section: String,
    /// Starting octet of a partial fetch.
    pub origin: Option<u32>,
    /// Section content; `None` when the server answered `NIL`.
    pub data: Option<Bytes>,
}

/// One data item of an untagged FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags; empty when the server sent `()`.
    Flags(Vec<String>),
    /// Unique identifier.
    Uid(Uid),
    /// RFC822.SIZE.
    Rfc822Size(u32),
    /// INTERNALDATE, unparsed.
    InternalDate(String),
    /// ENVELOPE.
    Envelope(Box<Envelope>),
    /// BODYSTRUCTURE, or BODY without a section.
    BodyStructure(Box<BodyStructure>),
    /// BODY[section] data, including the RFC822 aliases.
    Body(BodyData),
    /// MODSEQ (RFC 7162).
    ModSeq(u64),
}

impl FetchItem {
    /// Decodes the parenthesized item list at the response cursor.
    ///
    /// Unknown items are skipped.
    pub fn parse_all(response: &mut Response) -> Result<Vec<Self>> {
        response.with_lexer(|lexer| {
            lexer.skip_spaces();
            Self::parse_list(lexer)
        })
    }

    /// Decodes a parenthesized item list.
    pub fn parse_list(lexer: &mut Lexer<'_>) -> Result<Vec<Self>> {
        lexer.expect(Token::LParen)?;

        let mut items = Vec::new();

        loop {
            match lexer.next_token()? {
                Token::RParen => break,
                Token::Eof => return Err(lexer.truncated()),
                Token::Atom(name) => {
                    let upper = name.to_ascii_uppercase();
                    if let Some(item) = parse_item(lexer, &upper)? {
                        items.push(item);
                    }
                }
                _ => {}
            }
        }

        Ok(items)
    }

    /// Returns the section data if this is a body item.
    #[must_use]
    pub fn into_body(self) -> Option<BodyData> {
        match self {
            Self::Body(body) => Some(body),
            _ => None,
        }
    }
}

fn parse_item(lexer: &mut Lexer<'_>, name: &str) -> Result<Option<FetchItem>> {
    let item = match name {
        "FLAGS" => FetchItem::Flags(lexer.read_simple_list().unwrap_or_default()),
        "UID" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            let uid = Uid::new(n).ok_or_else(|| lexer.error("UID cannot be 0"))?;
            FetchItem::Uid(uid)
        }
        "RFC822.SIZE" => {
            lexer.expect_space()?;
            FetchItem::Rfc822Size(lexer.read_number()?)
        }
        "INTERNALDATE" => {
            lexer.expect_space()?;
            match lexer.read_nstring_lenient()? {
                Some(date) => FetchItem::InternalDate(date),
                None => return Ok(None),
            }
        }
        "ENVELOPE" => {
            lexer.expect_space()?;
            FetchItem::Envelope(Box::new(parse_envelope(lexer)?))
        }
        "BODYSTRUCTURE" => {
            lexer.expect_space()?;
            FetchItem::BodyStructure(Box::new(parse_body_structure(lexer)?))
        }
        "BODY" | "BODY.PEEK" | "BINARY" if lexer.peek() == Some(b'[') => {
            let section = read_section(lexer)?;
            let origin = read_origin(lexer)?;
            lexer.expect_space()?;
            FetchItem::Body(BodyData {
                section,
                origin,
                data: read_section_data(lexer)?,
            })
        }
        "BODY" => {
            lexer.expect_space()?;
            FetchItem::BodyStructure(Box::new(parse_body_structure(lexer)?))
        }
        "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
            lexer.expect_space()?;
            let section = name.strip_prefix("RFC822").unwrap_or_default();
            FetchItem::Body(BodyData {
                section: section.trim_start_matches('.').to_string(),
                origin: None,
                data: read_section_data(lexer)?,
            })
        }
        "MODSEQ" => {
            lexer.expect_space()?;
            lexer.expect(Token::LParen)?;
            let digits = lexer.read_raw_atom()?;
            let modseq = digits
                .parse()
                .map_err(|_| lexer.error(&format!("Invalid MODSEQ value: {digits}")))?;
            lexer.expect(Token::RParen)?;
            FetchItem::ModSeq(modseq)
        }
        _ => {
            skip_item_value(lexer)?;
            return Ok(None);
        }
    };
    Ok(Some(item))
}

/// Reads `[section]`, returning the text between the brackets.
fn read_section(lexer: &mut Lexer<'_>) -> Result<String> {
    lexer.advance();
    let start = lexer.position();
    let Some(len) = lexer.remaining().iter().position(|&b| b == b']') else {
        return Err(Error::Truncated {
            position: start + lexer.remaining().len(),
        });
    };
    let section = String::from_utf8_lossy(&lexer.remaining()[..len]).into_owned();
    lexer.skip(len + 1);
    Ok(section)
}

/// Reads an optional `<origin>` suffix.
fn read_origin(lexer: &mut Lexer<'_>) -> Result<Option<u32>> {
    if lexer.peek() != Some(b'<') {
        return Ok(None);
    }
    lexer.advance();
    let digits = lexer
        .remaining()
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let origin = std::str::from_utf8(&lexer.remaining()[..digits])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| lexer.error("Invalid partial origin"))?;
    lexer.skip(digits);
    match lexer.advance() {
        Some(b'>') => Ok(Some(origin)),
        None => Err(lexer.truncated()),
        Some(_) => Err(lexer.error("Expected '>' after partial origin")),
    }
}

fn read_section_data(lexer: &mut Lexer<'_>) -> Result<Option<Bytes>> {
    match lexer.next_token()? {
        Token::Literal(data) => Ok(Some(Bytes::from(data))),
        Token::QuotedString(s) => Ok(Some(Bytes::from(s))),
        Token::Nil => Ok(None),
        token => Err(lexer.unexpected("section data", &token)),
    }
}

/// Skips the value of an unknown item, honouring nesting and literals.
fn skip_item_value(lexer: &mut Lexer<'_>) -> Result<()> {
    lexer.skip_spaces();
    let mut depth = 0usize;
    loop {
        match lexer.peek() {
            None => return Err(lexer.truncated()),
            Some(b')') if depth == 0 => return Ok(()),
            Some(b' ') if depth == 0 => return Ok(()),
            _ => {}
        }
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::Eof => return Err(lexer.truncated()),
            _ => {}
        }
        if depth == 0 && matches!(lexer.peek(), Some(b' ' | b')')) {
            return Ok(());
        }
    }
}
