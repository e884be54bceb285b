//! SASL mechanisms for the SMTP AUTH exchange.
//!
//! - [`DigestMd5`]: RFC 2831 DIGEST-MD5 client with server verification
//! - [`Directives`]: the `key=value` list format DIGEST-MD5 challenges use

mod digest_md5;
mod directives;

pub use digest_md5::{DigestMd5, DigestSession};
pub use directives::{DirectiveWriter, Directives};
