//! Core IMAP types.
//!
//! Identifiers, status keywords and capabilities shared by the parser and
//! the command channel.

mod capability;
mod identifiers;

pub use capability::{Capability, Status};
pub use identifiers::{SeqNum, Tag, Uid};
