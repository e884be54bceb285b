//! # mailwire-smtp
//!
//! SMTP reply parsing and SASL authentication.
//!
//! ## Features
//!
//! - **Reply parsing**: single and multi-line replies, including the `334`
//!   continuations that carry SASL challenges
//! - **Extensions**: EHLO keyword parsing with the AUTH mechanism registry
//! - **DIGEST-MD5**: RFC 2831 client response and `rspauth` verification
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwire_smtp::auth::DigestMd5;
//!
//! // `challenge` is the server's `334 <base64>` line after `AUTH DIGEST-MD5`.
//! let (response, session) = DigestMd5::new()
//!     .authenticate_client("smtp.example.com", "user", "password", None, &challenge)?;
//! send_line(&response).await?;
//!
//! // The next `334` line carries `rspauth`.
//! if !session.authenticate_server(&next_challenge)? {
//!     return Err("server could not prove it knows the password".into());
//! }
//! send_line("").await?;
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: SASL mechanisms
//! - [`parser`]: Reply parser
//! - [`types`]: Replies, reply codes and extensions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
mod error;
pub mod parser;
pub mod types;

pub use auth::{DigestMd5, DigestSession};
pub use error::{Error, Result};
pub use types::{AuthMechanism, Extension, Reply, ReplyCode};
