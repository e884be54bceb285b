//! # mailwire-mime
//!
//! MIME primitives used by the mailwire protocol crates.
//!
//! ## Features
//!
//! - **Headers**: ordered, case-insensitive header fields with folding support
//! - **Content types**: `type/subtype` rendering over ordered parameter lists
//! - **Decoding**: RFC 2047 encoded-words in `B` and `Q` form, plus base64
//!   and quoted-printable transfer encodings
//! - **Parts**: read-only [`Part`] accessors split from the [`PartMut`] mutators
//!
//! ## Quick Start
//!
//! ```
//! use mailwire_mime::{ContentType, Headers};
//!
//! let headers = Headers::parse("Content-Type: text/plain;\r\n charset=us-ascii\r\n\r\n");
//! assert_eq!(headers.get("content-type"), Some("text/plain; charset=us-ascii"));
//!
//! let ct = ContentType::new("text", "plain").with_parameter("charset", "us-ascii");
//! assert_eq!(ct.to_string(), "text/plain; charset=us-ascii");
//!
//! let subject = mailwire_mime::encoding::decode_text("=?utf-8?Q?caf=C3=A9?=")?;
//! assert_eq!(subject, "café");
//! # Ok::<(), mailwire_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod part;

pub mod encoding;

pub use content_type::{ContentType, ParameterList};
pub use error::{Error, Result};
pub use header::{Header, Headers};
pub use part::{MemoryPart, Part, PartMut};
