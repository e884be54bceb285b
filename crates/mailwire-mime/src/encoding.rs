//! MIME decoding utilities.
//!
//! Supports RFC 2047 encoded-words in header text, with the `B` (Base64)
//! and `Q` (quoted-printable) encodings over UTF-8, US-ASCII and
//! ISO-8859-1 payloads.

use crate::error::{Error, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 engine that accepts encoded-words with or without padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes header text that may contain RFC 2047 encoded-words.
///
/// Words that do not have the `=?charset?encoding?text?=` shape are kept
/// verbatim. Whitespace between two adjacent encoded-words is dropped.
///
/// # Errors
///
/// Returns an error if an encoded-word is malformed or names an
/// unsupported charset.
pub fn decode_text(text: &str) -> Result<String> {
    if !text.contains("=?") {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut previous_encoded = false;
    let mut rest = text;

    while !rest.is_empty() {
        let trimmed = rest.trim_start();
        let (space, tail) = rest.split_at(rest.len() - trimmed.len());
        let word_len = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let (word, next) = tail.split_at(word_len);
        rest = next;

        if word.is_empty() {
            out.push_str(space);
            break;
        }

        if is_encoded_word(word) {
            let decoded = decode_word(word)?;
            if !previous_encoded {
                out.push_str(space);
            }
            out.push_str(&decoded);
            previous_encoded = true;
        } else {
            out.push_str(space);
            out.push_str(word);
            previous_encoded = false;
        }
    }

    Ok(out)
}

/// Returns true if `word` is shaped like an encoded-word.
#[must_use]
pub fn is_encoded_word(word: &str) -> bool {
    word.len() > 4 && word.starts_with("=?") && word.ends_with("?=")
}

/// Decodes a single RFC 2047 encoded-word.
///
/// # Errors
///
/// Returns an error if the word is malformed or its charset is unsupported.
pub fn decode_word(word: &str) -> Result<String> {
    if !is_encoded_word(word) {
        return Err(Error::InvalidEncoding(format!("not an encoded-word: {word}")));
    }

    let inner = &word[2..word.len() - 2];
    let mut parts = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(payload)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidEncoding(format!("malformed encoded-word: {word}")));
    };

    let bytes = match encoding {
        "B" | "b" => LENIENT_BASE64.decode(payload)?,
        "Q" | "q" => decode_q(payload)?,
        other => {
            return Err(Error::InvalidEncoding(format!(
                "unknown encoded-word encoding: {other}"
            )));
        }
    };

    // RFC 2231 allows a language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    decode_charset(&bytes, charset)
}

/// Decodes the `Q` encoding of RFC 2047.
fn decode_q(payload: &str) -> Result<Vec<u8>> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .ok_or_else(|| {
                        Error::InvalidEncoding("incomplete escape sequence".to_string())
                    })?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("invalid hex: {e}")))?;
                out.push(byte);
                i += 2;
            }
            other => out.push(other),
        }
        i += 1;
    }

    Ok(out)
}

/// Converts bytes in the named charset to a string.
///
/// # Errors
///
/// Returns an error if the charset is unsupported or the bytes are invalid
/// for it.
pub fn decode_charset(bytes: &[u8], charset: &str) -> Result<String> {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec()).map_err(Into::into),
        "us-ascii" | "ascii" => {
            if bytes.is_ascii() {
                Ok(decode_latin1(bytes))
            } else {
                Err(Error::InvalidEncoding(
                    "non-ASCII byte in us-ascii text".to_string(),
                ))
            }
        }
        "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Ok(decode_latin1(bytes)),
        _ => Err(Error::UnsupportedCharset(charset.to_string())),
    }
}

/// Decodes ISO-8859-1 bytes, which map one-to-one onto the first 256
/// code points.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Reverses a Content-Transfer-Encoding.
///
/// `7bit`, `8bit`, `binary` and a missing encoding pass the data through.
///
/// # Errors
///
/// Returns an error for malformed base64 or an unknown encoding.
pub fn decode_transfer(encoding: Option<&str>, data: &[u8]) -> Result<Vec<u8>> {
    let Some(encoding) = encoding else {
        return Ok(data.to_vec());
    };
    match encoding.trim().to_ascii_lowercase().as_str() {
        "" | "7bit" | "8bit" | "binary" => Ok(data.to_vec()),
        "base64" => {
            let compact: Vec<u8> = data
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            Ok(LENIENT_BASE64.decode(compact)?)
        }
        "quoted-printable" => Ok(decode_quoted_printable(data)),
        other => Err(Error::InvalidEncoding(format!(
            "unknown transfer encoding: {other}"
        ))),
    }
}

/// Decodes quoted-printable body text (RFC 2045 section 6.7).
///
/// Soft line breaks are removed. A malformed escape is kept verbatim.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        if data[i] != b'=' {
            out.push(data[i]);
            i += 1;
            continue;
        }
        match data.get(i + 1..i + 3) {
            Some(b"\r\n") => i += 3,
            Some([b'\n', _]) => i += 2,
            Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => {
                let digits = std::str::from_utf8(hex).unwrap_or("00");
                out.push(u8::from_str_radix(digits, 16).unwrap_or(b'='));
                i += 3;
            }
            None if data.get(i + 1) == Some(&b'\n') => i += 2,
            None if i + 1 == data.len() => i += 1,
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}
