//! SASL DIGEST-MD5 client (RFC 2831), `qop=auth` only.
//!
//! The exchange has two steps. [`DigestMd5::authenticate_client`] answers
//! the server's challenge and returns a [`DigestSession`]; the session then
//! checks the server's `rspauth` with [`DigestSession::authenticate_server`].

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use rand::RngCore;
use rand::rngs::OsRng;

use super::directives::{DirectiveWriter, Directives};
use crate::error::{Error, Result};
use crate::parser::{has_reply_code, parse_reply_text};

/// Nonce count; each session sends exactly one response.
const NONCE_COUNT: &str = "00000001";

/// Only quality of protection offered.
const QOP: &str = "auth";

/// Random bytes in a client nonce.
const CNONCE_LEN: usize = 32;

/// DIGEST-MD5 authenticator.
///
/// ```
/// use mailwire_smtp::auth::DigestMd5;
///
/// let challenge = "cmVhbG09ImV4YW1wbGUuY29tIixub25jZT0iYWJjIixxb3A9ImF1dGgiLGNoYXJzZXQ9dXRmLTg=";
/// let (response, session) = DigestMd5::new()
///     .authenticate_client("example.com", "chris", "secret", None, challenge)
///     .unwrap();
/// assert!(!response.is_empty());
/// assert_eq!(session.digest_uri(), "smtp/example.com");
/// ```
#[derive(Debug, Clone)]
pub struct DigestMd5<R = OsRng> {
    rng: R,
    service: String,
}

impl DigestMd5 {
    /// Creates an authenticator for the `smtp` service using the OS random source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: OsRng,
            service: "smtp".to_string(),
        }
    }
}

impl Default for DigestMd5 {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> DigestMd5<R> {
    /// Replaces the random source used for client nonces.
    #[must_use]
    pub fn with_rng<T: RngCore>(self, rng: T) -> DigestMd5<T> {
        DigestMd5 {
            rng,
            service: self.service,
        }
    }

    /// Sets the service name in `digest-uri` (`<service>/<host>`).
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Answers a server challenge.
    ///
    /// `challenge` is the base64 payload, with or without the SMTP `334 `
    /// prefix. `realm` overrides the realm offered by the server. Returns
    /// the base64 response to send and the session needed to verify the
    /// server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the challenge is not valid base64, is not
    /// a directive list, or carries no nonce.
    pub fn authenticate_client(
        &mut self,
        host: &str,
        user: &str,
        password: &str,
        realm: Option<&str>,
        challenge: &str,
    ) -> Result<(String, DigestSession)> {
        let directives = Directives::parse(&decode_payload(challenge)?)?;

        let mut bytes = [0u8; CNONCE_LEN];
        self.rng.fill_bytes(&mut bytes);
        let cnonce = STANDARD.encode(bytes);

        self.respond(host, user, password, realm, &directives, cnonce)
    }

    fn respond(
        &self,
        host: &str,
        user: &str,
        password: &str,
        realm: Option<&str>,
        directives: &Directives,
        cnonce: String,
    ) -> Result<(String, DigestSession)> {
        let realm = realm
            .unwrap_or_else(|| {
                directives
                    .get("realm")
                    .and_then(|realms| realms.split(',').next())
                    .map(str::trim)
                    .filter(|realm| !realm.is_empty())
                    .unwrap_or(host)
            })
            .to_string();
        let nonce = directives
            .get("nonce")
            .ok_or_else(|| Error::auth("challenge has no nonce"))?
            .to_string();
        let utf8 = directives
            .get("charset")
            .is_some_and(|charset| charset.eq_ignore_ascii_case("utf-8"));
        let digest_uri = format!("{}/{host}", self.service);

        let credentials = format!("{user}:{realm}:{password}");
        let credentials = if utf8 {
            credentials.into_bytes()
        } else {
            latin1_bytes(&credentials)
        };

        let mut a1 = Md5::new();
        a1.update(Md5::digest(&credentials));
        a1.update(format!(":{nonce}:{cnonce}").as_bytes());
        let client_response = format!(
            "{}:{nonce}:{NONCE_COUNT}:{cnonce}:{QOP}:",
            to_hex(&a1.finalize())
        );
        let response = chain(&client_response, &format!("AUTHENTICATE:{digest_uri}"));

        let mut writer = DirectiveWriter::new();
        writer
            .quoted("username", user)
            .quoted("realm", &realm)
            .bare("qop", QOP)
            .bare("nc", NONCE_COUNT)
            .quoted("nonce", &nonce)
            .quoted("cnonce", &cnonce)
            .quoted("digest-uri", &digest_uri);
        if utf8 {
            writer.quoted("charset", "utf-8");
        }
        writer.bare("response", &response);

        tracing::debug!(%realm, %digest_uri, utf8, "answered DIGEST-MD5 challenge");

        let session = DigestSession {
            realm,
            nonce,
            cnonce,
            digest_uri,
            utf8,
            client_response,
        };
        let payload = writer.finish();
        let payload = if utf8 {
            payload.into_bytes()
        } else {
            latin1_bytes(&payload)
        };
        Ok((STANDARD.encode(payload), session))
    }
}

/// State kept between the client response and the server's verification.
#[derive(Clone)]
pub struct DigestSession {
    realm: String,
    nonce: String,
    cnonce: String,
    digest_uri: String,
    utf8: bool,
    client_response: String,
}

impl DigestSession {
    /// Checks the server's `rspauth`.
    ///
    /// `server_response` is the base64 payload, with or without the SMTP
    /// `334 ` prefix. Returns false if `rspauth` is missing or differs from
    /// the expected value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the payload cannot be decoded.
    pub fn authenticate_server(&self, server_response: &str) -> Result<bool> {
        let directives = Directives::parse(&decode_payload(server_response)?)?;
        let expected = self.expected_rspauth();

        let verified = directives.get("rspauth") == Some(expected.as_str());
        if !verified {
            tracing::warn!(digest_uri = %self.digest_uri, "server rspauth did not verify");
        }
        Ok(verified)
    }

    /// Realm used in the response.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Server nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Client nonce.
    #[must_use]
    pub fn cnonce(&self) -> &str {
        &self.cnonce
    }

    /// `digest-uri` sent to the server.
    #[must_use]
    pub fn digest_uri(&self) -> &str {
        &self.digest_uri
    }

    /// Whether the server negotiated UTF-8.
    #[must_use]
    pub const fn utf8(&self) -> bool {
        self.utf8
    }

    fn expected_rspauth(&self) -> String {
        chain(&self.client_response, &format!(":{}", self.digest_uri))
    }
}

impl std::fmt::Debug for DigestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestSession")
            .field("realm", &self.realm)
            .field("nonce", &self.nonce)
            .field("cnonce", &self.cnonce)
            .field("digest_uri", &self.digest_uri)
            .field("utf8", &self.utf8)
            .finish_non_exhaustive()
    }
}

/// `hex(MD5(client_response || hex(MD5(a2))))`
fn chain(client_response: &str, a2: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(client_response.as_bytes());
    hasher.update(to_hex(&Md5::digest(a2.as_bytes())).as_bytes());
    to_hex(&hasher.finalize())
}

/// Strips an optional SMTP reply prefix and decodes the base64 payload.
///
/// A payload that is not UTF-8 is read as ISO-8859-1.
fn decode_payload(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let payload = if has_reply_code(raw) {
        let reply = parse_reply_text(raw).map_err(|err| Error::auth(err.to_string()))?;
        if !reply.is_auth_continue() {
            return Err(Error::auth(format!("unexpected reply {}", reply.code)));
        }
        reply.message.concat()
    } else {
        raw.to_string()
    };

    let compact: String = payload.split_ascii_whitespace().collect();
    let decoded = STANDARD.decode(compact)?;
    Ok(String::from_utf8(decoded)
        .unwrap_or_else(|err| err.into_bytes().into_iter().map(char::from).collect()))
}

/// Encodes each char as one byte, keeping the low byte of chars above
/// U+00FF.
fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| u32::from(c).to_le_bytes()[0]).collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}
