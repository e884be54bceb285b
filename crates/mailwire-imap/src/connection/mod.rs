//! Connection plumbing.
//!
//! - Framed I/O that reads complete response lines, literals included
//! - [`ImapProtocol`], the command channel behind a [`Session`](crate::Session)

mod framed;
mod protocol;

pub use framed::{FramedStream, ResponseAccumulator};
pub use protocol::ImapProtocol;
