//! Byte streams over body sections.
//!
//! A [`ContentStream`] is either data already in memory or a [`BlockStream`]
//! that fetches the section in fixed-size partial fetches as it is read. The
//! session lock is taken once per block, so other commands can run between
//! reads.

#![allow(clippy::missing_errors_doc)]

use bytes::{Bytes, BytesMut};

use crate::Result;
use crate::command::ByteRange;
use crate::message::{MessageHandle, fetch_section, reconcile_expunge};

/// Sequential reader over a section's bytes.
pub enum ContentStream<'m, M: MessageHandle> {
    /// Data fetched up front.
    Buffered(Option<Bytes>),
    /// Data fetched block by block.
    Blocks(BlockStream<'m, M>),
}

impl<'m, M: MessageHandle> ContentStream<'m, M> {
    /// A stream over bytes already in memory.
    #[must_use]
    pub const fn buffered(data: Bytes) -> Self {
        Self::Buffered(Some(data))
    }

    /// A stream with nothing in it.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Buffered(None)
    }

    /// Returns the next non-empty chunk, or `None` at the end.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self {
            Self::Buffered(data) => Ok(data.take().filter(|data| !data.is_empty())),
            Self::Blocks(blocks) => blocks.next_block().await,
        }
    }

    /// Reads everything that is left.
    pub async fn read_to_end(mut self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

impl<M: MessageHandle> std::fmt::Debug for ContentStream<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(data) => f
                .debug_tuple("Buffered")
                .field(&data.as_ref().map(Bytes::len))
                .finish(),
            Self::Blocks(blocks) => f
                .debug_struct("Blocks")
                .field("section", &blocks.section)
                .field("position", &blocks.position)
                .field("size", &blocks.size)
                .finish_non_exhaustive(),
        }
    }
}

/// Lazily fetches a section in blocks of a fixed size.
pub struct BlockStream<'m, M: MessageHandle> {
    message: &'m M,
    section: String,
    peek: bool,
    block_size: u32,
    size: Option<u32>,
    position: u32,
    done: bool,
}

impl<'m, M: MessageHandle> BlockStream<'m, M> {
    /// Creates a stream over `section` of `message`.
    ///
    /// With a known `size` the stream ends once that many octets have been
    /// read. Without one it ends at the first short or empty block.
    pub(crate) fn new(
        message: &'m M,
        section: impl Into<String>,
        peek: bool,
        block_size: u32,
        size: Option<u32>,
    ) -> Self {
        Self {
            message,
            section: section.into(),
            peek,
            block_size,
            size,
            position: 0,
            done: false,
        }
    }

    /// Octets read so far.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    /// Fetches the next block.
    pub async fn next_block(&mut self) -> Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }

        let length = match self.size {
            Some(size) => {
                let remaining = size.saturating_sub(self.position);
                if remaining == 0 {
                    self.done = true;
                    return Ok(None);
                }
                remaining.min(self.block_size)
            }
            None => self.block_size,
        };

        let range = ByteRange::new(self.position, length);
        let data = fetch_section(self.message, &self.section, self.peek, Some(range))
            .await?
            .unwrap_or_default();

        tracing::debug!(
            section = %self.section,
            origin = range.origin,
            requested = length,
            received = data.len(),
            "fetched block"
        );

        if data.is_empty() {
            self.done = true;
            reconcile_expunge(self.message, &self.section).await?;
            return Ok(None);
        }

        let received = u32::try_from(data.len()).unwrap_or(u32::MAX);
        self.position = self.position.saturating_add(received);
        if received < length {
            self.done = true;
        }

        Ok(Some(data))
    }
}

/// A part's header bytes followed by its content bytes.
pub struct MimeStream<'m, M: MessageHandle> {
    header: Option<ContentStream<'m, M>>,
    content: ContentStream<'m, M>,
}

impl<'m, M: MessageHandle> MimeStream<'m, M> {
    pub(crate) const fn new(header: ContentStream<'m, M>, content: ContentStream<'m, M>) -> Self {
        Self {
            header: Some(header),
            content,
        }
    }

    /// Returns the next chunk; header chunks come first.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(header) = &mut self.header {
            if let Some(chunk) = header.next_chunk().await? {
                return Ok(Some(chunk));
            }
            self.header = None;
        }
        self.content.next_chunk().await
    }

    /// Reads everything that is left.
    pub async fn read_to_end(mut self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}
