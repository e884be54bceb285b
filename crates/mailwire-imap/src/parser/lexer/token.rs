//! Lexical tokens of an IMAP response line.

/// Token produced by the [`Lexer`](super::Lexer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Run of atom characters that is not all digits and not `NIL`.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    QuotedString(String),
    /// Literal data following a `{n}` prefix.
    Literal(Vec<u8>),
    /// All-digit atom that fits in a `u32`.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`, the untagged marker.
    Asterisk,
    /// `+`, the continuation marker.
    Plus,
    /// `NIL` in any case.
    Nil,
    /// Line terminator.
    Crlf,
    /// End of input.
    Eof,
}
