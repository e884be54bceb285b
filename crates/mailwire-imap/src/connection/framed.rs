//! Framed I/O for IMAP protocol.
//!
//! IMAP uses CRLF-terminated lines with support for literals.
//! This module provides buffered reading and writing with proper
//! handling of the IMAP framing.

#![allow(clippy::missing_errors_doc)]

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::parser::Response;
use crate::types::Tag;
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Framed connection for IMAP protocol.
///
/// Handles line-based reading with literal support and buffered writing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
        }
    }

    /// Reads a complete IMAP response line, handling literals.
    ///
    /// IMAP responses can contain literals in the format `{n}\r\n<n bytes>`.
    /// This method reads the entire response including any embedded literals.
    /// End of stream is reported as [`Error::SessionClosed`].
    pub async fn read_response(&mut self) -> Result<Bytes> {
        let mut response = BytesMut::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            // Check for literal at end of line: {123} or {123+}
            let Some(literal_len) = parse_literal_length(&line) else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }
            let mut literal = vec![0u8; literal_len];
            self.reader
                .read_exact(&mut literal)
                .await
                .map_err(closed_on_eof)?;
            response.extend_from_slice(&literal);
        }

        Ok(response.freeze())
    }

    /// Reads a single CRLF-terminated line.
    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await.map_err(closed_on_eof)?;
            if buf.is_empty() {
                return Err(Error::SessionClosed("connection closed by server".to_string()));
            }

            if let Some(pos) = find_crlf(buf) {
                line.extend_from_slice(&buf[..pos + 2]);
                self.reader.consume(pos + 2);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            // CR at the end of one read, LF at the start of the next
            if line.ends_with(b"\r") && self.reader.fill_buf().await?.first() == Some(&b'\n') {
                line.push(b'\n');
                self.reader.consume(1);
                break;
            }

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        Ok(line)
    }

    /// Writes a command to the stream.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await.map_err(closed_on_eof)?;
        stream.flush().await.map_err(closed_on_eof)?;
        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Consumes the framed stream and returns the inner stream.
    ///
    /// Note: Any buffered data will be lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

/// Maps connection-level I/O failures to [`Error::SessionClosed`].
fn closed_on_eof(err: std::io::Error) -> Error {
    let err = Error::Io(err);
    if err.is_connection_lost() {
        Error::SessionClosed(err.to_string())
    } else {
        err
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    let inner = line[open + 1..].strip_suffix(b"}")?;
    let digits = inner.strip_suffix(b"+").unwrap_or(inner);

    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Collects response lines until the completion for one tag arrives.
pub struct ResponseAccumulator {
    tag: Tag,
}

impl ResponseAccumulator {
    /// Creates a new response accumulator for the given tag.
    pub const fn new(tag: Tag) -> Self {
        Self { tag }
    }

    /// Reads responses until the tagged response matching our tag.
    ///
    /// The tagged completion is the last element. An untagged `BYE` ends the
    /// exchange with [`Error::SessionClosed`].
    pub async fn read_until_tagged<S>(&self, framed: &mut FramedStream<S>) -> Result<Vec<Response>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut responses = Vec::new();

        loop {
            let response = Response::parse(framed.read_response().await?)?;

            if response.is_untagged() && response.is_bye() {
                return Err(Error::SessionClosed(response.text()));
            }

            let done = response.tag() == Some(&self.tag);
            responses.push(response);

            if done {
                return Ok(responses);
            }
        }
    }
}
