//! IMAP response parser.
//!
//! A sans-I/O parser for server response lines (RFC 3501 / RFC 9051).
//!
//! - **Lexer**: tokenizes raw bytes into atoms, strings, literals and numbers
//! - **Response**: classifies a line and exposes a cursor over the rest of it,
//!   with field decoders for FETCH items, envelopes and body structures
//!
//! # Example
//!
//! ```
//! use mailwire_imap::parser::{FetchItem, Response};
//!
//! let mut response = Response::parse(&b"* 4 FETCH (UID 17 FLAGS (\\Seen))\r\n"[..]).unwrap();
//! assert_eq!(response.number(), Some(4));
//! assert!(response.key_equals("fetch"));
//!
//! let items = FetchItem::parse_all(&mut response).unwrap();
//! assert_eq!(items.len(), 2);
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{
    Address, BodyData, BodyKind, BodyStructure, Disposition, Envelope, FetchItem, Response,
    ResponseKind,
};
