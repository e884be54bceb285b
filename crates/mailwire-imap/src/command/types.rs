//! Command-related type definitions.

/// Octet window of a partial fetch (`<origin.length>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First octet to return.
    pub origin: u32,
    /// Maximum number of octets to return.
    pub length: u32,
}

impl ByteRange {
    /// Creates a range starting at `origin` spanning at most `length` octets.
    #[must_use]
    pub const fn new(origin: u32, length: u32) -> Self {
        Self { origin, length }
    }

    /// Origin of the range that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            origin: self.origin.saturating_add(self.length),
            length: self.length,
        }
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// RFC822 size.
    Rfc822Size,
    /// Body structure.
    BodyStructure,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier; empty for the whole message.
        section: String,
        /// Peek (don't set \Seen).
        peek: bool,
        /// Partial fetch range.
        partial: Option<ByteRange>,
    },
}

impl FetchAttribute {
    /// Body section attribute without a partial range.
    #[must_use]
    pub fn body(section: impl Into<String>, peek: bool) -> Self {
        Self::Body {
            section: section.into(),
            peek,
            partial: None,
        }
    }
}
