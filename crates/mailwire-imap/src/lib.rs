//! # mailwire-imap
//!
//! Read-only access to message body parts on an IMAP server.
//!
//! ## Features
//!
//! - **Sans-I/O response parser**: lexer, response classifier and decoders
//!   for FETCH items, envelopes and BODYSTRUCTURE
//! - **Body parts**: a [`BodyPart`] exposes one section of a message with its
//!   structure metadata, lazily loaded MIME headers and content streams
//! - **Block streaming**: large sections are fetched in partial fetches of a
//!   configurable size, releasing the session between blocks
//! - **Legacy servers**: pre-`IMAP4rev1` servers get whole-section fetches and
//!   headers synthesized from the body structure
//! - **Expunge handling**: empty fetches are reconciled against the mailbox so
//!   a removed message surfaces as [`Error::MessageRemoved`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_imap::{BodyPart, FetchConfig, ImapProtocol, Session};
//!
//! let protocol = ImapProtocol::from_greeting(stream).await?;
//! let session = Session::new(protocol, FetchConfig::default());
//! // `message` implements `MessageHandle` for a message in the selected mailbox.
//! for part in BodyPart::for_message(&message, &structure) {
//!     let headers = part.load_headers().await?;
//!     let content = part.decoded_content().await?;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: commands the retriever sends
//! - [`connection`]: framed I/O and the IMAP command channel
//! - [`parser`]: sans-I/O response parser
//! - [`types`]: identifiers, status keywords and capabilities

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod body_part;
pub mod command;
mod config;
pub mod connection;
mod error;
mod message;
pub mod parser;
mod session;
mod stream;
pub mod types;

pub use body_part::BodyPart;
pub use command::{ByteRange, Command, FetchAttribute, TagGenerator};
pub use config::{DEFAULT_FETCH_BLOCK_SIZE, FetchConfig, FetchConfigBuilder};
pub use connection::{FramedStream, ImapProtocol, ResponseAccumulator};
pub use error::{Error, Result};
pub use message::MessageHandle;
pub use parser::{BodyData, BodyStructure, FetchItem, Response};
pub use session::{Protocol, Revision, Session};
pub use stream::{BlockStream, ContentStream, MimeStream};
pub use types::{Capability, SeqNum, Status, Tag, Uid};
