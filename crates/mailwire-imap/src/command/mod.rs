//! IMAP command builder.
//!
//! Only the commands a read-only body retriever issues are modelled.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{SeqNum, Tag};

pub use tag_generator::TagGenerator;
pub use types::{ByteRange, FetchAttribute};

use serialize::write_fetch_items;

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// FETCH command for a single message.
    Fetch {
        /// Message sequence number.
        sequence: SeqNum,
        /// Items to fetch.
        items: Vec<FetchAttribute>,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &Tag) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_str().as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Fetch { sequence, items } => {
                buf.extend_from_slice(b"FETCH ");
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Fetch { .. } => "FETCH",
        }
    }
}
