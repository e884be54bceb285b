//! BODYSTRUCTURE decoding.
//!
//! Grammar (RFC 3501 section 9, extension data included):
//!
//! ```text
//! body        = "(" (body-type-1part / body-type-mpart) ")"
//! 1part       = type SP subtype SP params SP id SP desc SP enc SP size
//!               [SP envelope SP body SP lines]   ; message/rfc822
//!               [SP lines]                       ; text/*
//!               [SP md5 [SP dsp [SP lang [SP loc *(SP ext)]]]]
//! mpart       = 1*body SP subtype
//!               [SP params [SP dsp [SP lang [SP loc *(SP ext)]]]]
//! ```

use mailwire_mime::{ContentType, ParameterList};

use super::envelope::{Envelope, parse_envelope};
use crate::Result;
use crate::parser::lexer::{Lexer, Token};

/// Content-Disposition reported in extension data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Disposition type, lowercased (`inline`, `attachment`, ...).
    pub kind: String,
    /// Disposition parameters such as `filename`.
    pub params: ParameterList,
}

/// Shape of a body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// A single part with content.
    Leaf,
    /// A multipart container.
    Multipart(Vec<BodyStructure>),
    /// An encapsulated `message/rfc822` (or `message/global`) part.
    Message {
        /// Envelope of the nested message.
        envelope: Box<Envelope>,
        /// Body of the nested message.
        body: Box<BodyStructure>,
    },
}

/// Structural metadata for one MIME body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyStructure {
    /// Media type, lowercased.
    pub media_type: String,
    /// Media subtype, lowercased.
    pub media_subtype: String,
    /// Content-Type parameters in server order.
    pub params: ParameterList,
    /// Content-ID.
    pub id: Option<String>,
    /// Content-Description, still encoded.
    pub description: Option<String>,
    /// Content-Transfer-Encoding.
    pub encoding: Option<String>,
    /// Size in octets.
    pub size: Option<u32>,
    /// Size in text lines.
    pub lines: Option<u32>,
    /// Content-MD5.
    pub md5: Option<String>,
    /// Content-Disposition.
    pub disposition: Option<Disposition>,
    /// Content-Language values.
    pub language: Vec<String>,
    /// Content-Location.
    pub location: Option<String>,
    /// Leaf, multipart or nested message.
    pub kind: BodyKind,
}

impl BodyStructure {
    /// Creates a leaf structure with the given media type and nothing else.
    #[must_use]
    pub fn leaf(media_type: impl Into<String>, media_subtype: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            media_subtype: media_subtype.into(),
            params: ParameterList::new(),
            id: None,
            description: None,
            encoding: None,
            size: None,
            lines: None,
            md5: None,
            disposition: None,
            language: Vec::new(),
            location: None,
            kind: BodyKind::Leaf,
        }
    }

    /// Returns true for a single content part.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, BodyKind::Leaf)
    }

    /// Returns true for a multipart container.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.kind, BodyKind::Multipart(_))
    }

    /// Returns true for an encapsulated message.
    #[must_use]
    pub const fn is_nested(&self) -> bool {
        matches!(self.kind, BodyKind::Message { .. })
    }

    /// Child parts of a multipart container; empty otherwise.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.kind {
            BodyKind::Multipart(parts) => parts,
            _ => &[],
        }
    }

    /// Envelope of an encapsulated message.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        match &self.kind {
            BodyKind::Message { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// Body of an encapsulated message.
    #[must_use]
    pub fn nested_body(&self) -> Option<&Self> {
        match &self.kind {
            BodyKind::Message { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.media_type, self.media_subtype)
    }

    /// Builds the full content type including parameters.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::new(&self.media_type, &self.media_subtype).with_parameters(self.params.clone())
    }
}

/// Parses a BODYSTRUCTURE (or BODY) value.
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;

    let body = if lexer.peek() == Some(b'(') {
        parse_multipart(lexer)?
    } else {
        parse_single(lexer)?
    };

    skip_to_close_paren(lexer)?;
    Ok(body)
}

fn parse_multipart(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    let mut parts = Vec::new();
    loop {
        match (lexer.peek(), lexer.peek_at(1)) {
            (Some(b'('), _) => parts.push(parse_body_structure(lexer)?),
            (Some(b' '), Some(b'(')) => {
                lexer.advance();
            }
            _ => break,
        }
    }

    lexer.expect_space()?;
    let subtype = read_lowercase(lexer)?;

    let mut body = BodyStructure::leaf("multipart", subtype);
    body.kind = BodyKind::Multipart(parts);

    if more(lexer) {
        body.params = parse_params(lexer)?;
        parse_tail_extensions(lexer, &mut body)?;
    }

    Ok(body)
}

fn parse_single(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    let media_type = read_lowercase(lexer)?;
    lexer.expect_space()?;
    let media_subtype = read_lowercase(lexer)?;

    let mut body = BodyStructure::leaf(media_type, media_subtype);

    lexer.expect_space()?;
    body.params = parse_params(lexer)?;
    lexer.expect_space()?;
    body.id = lexer.read_nstring_lenient()?;
    lexer.expect_space()?;
    body.description = lexer.read_nstring_lenient()?;
    lexer.expect_space()?;
    body.encoding = lexer.read_nstring_lenient()?;
    lexer.expect_space()?;
    body.size = lexer.read_optional_number()?;

    let is_message = body.media_type == "message"
        && matches!(body.media_subtype.as_str(), "rfc822" | "global");

    if is_message && lexer.peek() == Some(b' ') && lexer.peek_at(1) == Some(b'(') {
        lexer.advance();
        let envelope = parse_envelope(lexer)?;
        lexer.expect_space()?;
        let nested = parse_body_structure(lexer)?;
        body.kind = BodyKind::Message {
            envelope: Box::new(envelope),
            body: Box::new(nested),
        };
        if more(lexer) {
            body.lines = lexer.read_optional_number()?;
        }
    } else if body.media_type == "text" && more(lexer) {
        body.lines = lexer.read_optional_number()?;
    }

    if more(lexer) {
        body.md5 = lexer.read_nstring_lenient()?;
        parse_tail_extensions(lexer, &mut body)?;
    }

    Ok(body)
}

/// Parses `[SP dsp [SP lang [SP loc]]]`, the extension fields both part
/// kinds share.
fn parse_tail_extensions(lexer: &mut Lexer<'_>, body: &mut BodyStructure) -> Result<()> {
    if !more(lexer) {
        return Ok(());
    }
    body.disposition = parse_disposition(lexer)?;

    if !more(lexer) {
        return Ok(());
    }
    body.language = parse_language(lexer)?;

    if more(lexer) {
        body.location = lexer.read_nstring_lenient()?;
    }
    Ok(())
}

/// Consumes a separating space if another field follows it.
fn more(lexer: &mut Lexer<'_>) -> bool {
    if lexer.peek() != Some(b' ') {
        return false;
    }
    lexer.advance();
    lexer.skip_spaces();
    !matches!(lexer.peek(), Some(b')') | None)
}

fn read_lowercase(lexer: &mut Lexer<'_>) -> Result<String> {
    Ok(lexer
        .read_nstring_lenient()?
        .unwrap_or_default()
        .to_ascii_lowercase())
}

/// Parses body parameters (NIL or (key value key value ...)).
fn parse_params(lexer: &mut Lexer<'_>) -> Result<ParameterList> {
    match lexer.next_token()? {
        Token::Nil => Ok(ParameterList::new()),
        Token::LParen => {
            let mut params = ParameterList::new();
            loop {
                lexer.skip_spaces();
                if lexer.peek() == Some(b')') {
                    lexer.advance();
                    break;
                }
                let key = lexer.read_nstring_lenient()?;
                lexer.skip_spaces();
                let value = lexer.read_nstring_lenient()?;
                if let Some(key) = key {
                    params.set(key, value.unwrap_or_default());
                }
            }
            Ok(params)
        }
        token => Err(lexer.unexpected("body parameters", &token)),
    }
}

fn parse_disposition(lexer: &mut Lexer<'_>) -> Result<Option<Disposition>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::QuotedString(kind) => Ok(Some(Disposition {
            kind: kind.to_ascii_lowercase(),
            params: ParameterList::new(),
        })),
        Token::LParen => {
            let kind = read_lowercase(lexer)?;
            lexer.skip_spaces();
            let params = if lexer.peek() == Some(b')') {
                ParameterList::new()
            } else {
                parse_params(lexer)?
            };
            lexer.skip_spaces();
            lexer.expect(Token::RParen)?;
            Ok(Some(Disposition { kind, params }))
        }
        token => Err(lexer.unexpected("body disposition", &token)),
    }
}

fn parse_language(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::QuotedString(s) => Ok(vec![s]),
        Token::Atom(s) => Ok(vec![s.to_string()]),
        Token::Literal(data) => Ok(vec![String::from_utf8_lossy(&data).into_owned()]),
        Token::LParen => {
            let mut languages = Vec::new();
            loop {
                lexer.skip_spaces();
                if lexer.peek() == Some(b')') {
                    lexer.advance();
                    break;
                }
                if let Some(lang) = lexer.read_nstring_lenient()? {
                    languages.push(lang);
                }
            }
            Ok(languages)
        }
        token => Err(lexer.unexpected("body language", &token)),
    }
}

/// Skips unknown extension data up to and including the closing parenthesis
/// of the current body.
fn skip_to_close_paren(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => return Ok(()),
            Token::RParen => depth -= 1,
            Token::Eof => return Err(lexer.truncated()),
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> BodyStructure {
        let mut lexer = Lexer::new(input);
        let body = parse_body_structure(&mut lexer).unwrap();
        assert!(lexer.is_eof(), "unconsumed: {:?}", lexer.remaining());
        body
    }

    #[test]
    fn test_text_part() {
        let body = parse(br#"("TEXT" "PLAIN" ("CHARSET" "US-ASCII") NIL NIL "7BIT" 1152 23)"#);

        assert!(body.is_leaf());
        assert_eq!(body.mime_type(), "text/plain");
        assert_eq!(body.params.get("charset"), Some("US-ASCII"));
        assert_eq!(body.encoding.as_deref(), Some("7BIT"));
        assert_eq!(body.size, Some(1152));
        assert_eq!(body.lines, Some(23));
        assert!(body.disposition.is_none());
    }

    #[test]
    fn test_multipart_with_extensions() {
        let body = parse(
            br#"(("TEXT" "PLAIN" ("CHARSET" "US-ASCII") NIL NIL "7BIT" 10 1 NIL NIL NIL NIL)("APPLICATION" "PDF" ("NAME" "a.pdf") "<id@x>" "Report" "BASE64" 4096 "Q2hlY2sgSW50ZWdyaXR5IQ==" ("ATTACHMENT" ("FILENAME" "a.pdf")) "en" "http://x/a.pdf") "MIXED" ("BOUNDARY" "xyz") NIL ("en" "fr") NIL)"#,
        );

        assert!(body.is_multipart());
        assert_eq!(body.mime_type(), "multipart/mixed");
        assert_eq!(body.params.get("boundary"), Some("xyz"));
        assert_eq!(body.language, vec!["en".to_string(), "fr".to_string()]);
        assert_eq!(body.children().len(), 2);

        let pdf = &body.children()[1];
        assert_eq!(pdf.mime_type(), "application/pdf");
        assert_eq!(pdf.id.as_deref(), Some("<id@x>"));
        assert_eq!(pdf.description.as_deref(), Some("Report"));
        assert_eq!(pdf.md5.as_deref(), Some("Q2hlY2sgSW50ZWdyaXR5IQ=="));
        assert_eq!(pdf.lines, None);
        let disposition = pdf.disposition.as_ref().unwrap();
        assert_eq!(disposition.kind, "attachment");
        assert_eq!(disposition.params.get("filename"), Some("a.pdf"));
        assert_eq!(pdf.language, vec!["en".to_string()]);
        assert_eq!(pdf.location.as_deref(), Some("http://x/a.pdf"));
    }

    #[test]
    fn test_nested_message() {
        let body = parse(
            br#"("MESSAGE" "RFC822" NIL NIL NIL "7BIT" 342 ("date" "inner" NIL NIL NIL NIL NIL NIL NIL NIL) ("TEXT" "PLAIN" ("CHARSET" "US-ASCII") NIL NIL "7BIT" 20 2) 12)"#,
        );

        assert!(body.is_nested());
        assert_eq!(body.envelope().unwrap().subject.as_deref(), Some("inner"));
        assert_eq!(body.nested_body().unwrap().mime_type(), "text/plain");
        assert_eq!(body.lines, Some(12));
        assert!(body.children().is_empty());
    }

    #[test]
    fn test_message_without_envelope_is_leaf() {
        let body = parse(br#"("MESSAGE" "RFC822" NIL NIL NIL "7BIT" 342)"#);
        assert!(body.is_leaf());
    }

    #[test]
    fn test_unknown_extension_data_is_skipped() {
        let body = parse(
            b"(\"IMAGE\" \"PNG\" NIL NIL NIL \"BASE64\" 100 NIL NIL NIL NIL (\"x\" \")\" {3}\r\na)b) 7)",
        );
        assert_eq!(body.mime_type(), "image/png");
    }

    #[test]
    fn test_lenient_atoms_and_nil_size() {
        let body = parse(b"(TEXT HTML NIL NIL NIL 8BIT NIL 4)");
        assert_eq!(body.mime_type(), "text/html");
        assert_eq!(body.encoding.as_deref(), Some("8BIT"));
        assert_eq!(body.size, None);
        assert_eq!(body.lines, Some(4));
    }

    #[test]
    fn test_content_type_rendering() {
        let body = parse(br#"("TEXT" "PLAIN" ("CHARSET" "US-ASCII" "NAME" "my notes.txt") NIL NIL "7BIT" 1 1)"#);
        assert_eq!(
            body.content_type().to_string(),
            "text/plain; CHARSET=US-ASCII; NAME=\"my notes.txt\""
        );
    }

    #[test]
    fn test_truncated_structure() {
        let mut lexer = Lexer::new(br#"("TEXT" "PLAIN" ("CHARSET""#);
        assert!(matches!(
            parse_body_structure(&mut lexer),
            Err(crate::Error::Truncated { .. })
        ));
    }
}
