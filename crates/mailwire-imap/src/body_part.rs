//! Read-only view of one body section on the server.
//!
//! A [`BodyPart`] pairs a section of a message with the BODYSTRUCTURE the
//! server reported for it. Metadata comes from the structure; headers and
//! content are fetched on demand through the owning message's session.
//!
//! The view implements [`Part`] but not [`PartMut`](mailwire_mime::PartMut),
//! so there is nothing to call that would change a part:
//!
//! ```compile_fail
//! use mailwire_imap::{BodyPart, MessageHandle};
//! use mailwire_mime::PartMut;
//!
//! fn retitle<P: PartMut>(part: &mut P) {
//!     part.set_description("renamed");
//! }
//!
//! fn attempt<M: MessageHandle>(mut part: BodyPart<'_, M>) {
//!     retitle(&mut part);
//! }
//! ```

#![allow(clippy::missing_errors_doc)]

use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};
use mailwire_mime::encoding::{decode_text, decode_transfer};
use mailwire_mime::{Header, Headers, Part};
use tokio::sync::OnceCell;

use crate::message::{MessageHandle, fetch_section, reconcile_expunge};
use crate::parser::{BodyKind, BodyStructure};
use crate::session::Revision;
use crate::stream::{BlockStream, ContentStream, MimeStream};
use crate::{Error, Result};

/// One section of a message on the server.
pub struct BodyPart<'m, M: MessageHandle> {
    message: &'m M,
    structure: &'m BodyStructure,
    section: String,
    headers: OnceCell<Headers>,
    description: OnceLock<Option<String>>,
}

impl<'m, M: MessageHandle> BodyPart<'m, M> {
    /// Creates a view over `section`, described by `structure`.
    pub fn new(message: &'m M, structure: &'m BodyStructure, section: impl Into<String>) -> Self {
        Self {
            message,
            structure,
            section: section.into(),
            headers: OnceCell::new(),
            description: OnceLock::new(),
        }
    }

    /// Top-level parts of a message with the given structure.
    ///
    /// A multipart message yields one part per child (`1`, `2`, ...); any
    /// other message is the single part `1`.
    pub fn for_message(message: &'m M, structure: &'m BodyStructure) -> Vec<Self> {
        match &structure.kind {
            BodyKind::Multipart(children) => numbered(message, children, ""),
            _ => vec![Self::new(message, structure, "1")],
        }
    }

    /// Sub-parts of this part.
    ///
    /// Multipart children are numbered below this section. An encapsulated
    /// message on a rev1 session exposes the parts of its body. Leaves have
    /// no children.
    pub fn children(&self) -> Result<Vec<Self>> {
        let prefix = format!("{}.", self.section);
        match &self.structure.kind {
            BodyKind::Leaf => Ok(Vec::new()),
            BodyKind::Multipart(children) => Ok(numbered(self.message, children, &prefix)),
            BodyKind::Message { body, .. } => {
                if self.session_revision()? != Revision::Rev1 {
                    return Ok(Vec::new());
                }
                match &body.kind {
                    BodyKind::Multipart(children) => {
                        Ok(numbered(self.message, children, &prefix))
                    }
                    _ => Ok(vec![Self::new(self.message, body, format!("{prefix}1"))]),
                }
            }
        }
    }

    /// Section identifier, such as `2.1`.
    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Structure the server reported for this part.
    #[must_use]
    pub const fn structure(&self) -> &'m BodyStructure {
        self.structure
    }

    /// Stream over the part's content.
    ///
    /// On rev1 sessions with block fetching enabled, the content is
    /// fetched lazily in blocks. Otherwise it is fetched in one command. An
    /// empty result is reconciled against expunges and, if the message is
    /// still there, yields an empty stream.
    pub async fn content_stream(&self) -> Result<ContentStream<'m, M>> {
        self.message.check_expunged()?;
        let session = self.message.session()?;
        let config = session.config();
        let peek = self.message.peek();

        if let (Revision::Rev1, Some(block_size)) = (session.revision(), config.fetch_block_size)
        {
            let size = if config.ignore_body_structure_size {
                None
            } else {
                self.structure.size
            };
            tracing::debug!(
                section = %self.section,
                block_size = block_size.get(),
                ?size,
                "streaming content in blocks"
            );
            return Ok(ContentStream::Blocks(BlockStream::new(
                self.message,
                self.section.clone(),
                peek,
                block_size.get(),
                size,
            )));
        }

        tracing::debug!(section = %self.section, peek, "fetching content in one command");
        match fetch_section(self.message, &self.section, peek, None).await? {
            Some(data) => Ok(ContentStream::buffered(data)),
            None => {
                reconcile_expunge(self.message, &self.section).await?;
                Ok(ContentStream::empty())
            }
        }
    }

    /// Stream over the part's MIME header block.
    ///
    /// Rev1 sessions fetch the `.MIME` section. Legacy sessions serialize
    /// the synthesized headers followed by the blank terminator line.
    pub async fn header_stream(&self) -> Result<ContentStream<'m, M>> {
        self.message.check_expunged()?;
        if self.session_revision()? == Revision::Rev1 {
            let data = self.fetch_mime_section().await?;
            return Ok(ContentStream::buffered(data));
        }

        let headers = self.load_headers().await?;
        let mut block = BytesMut::new();
        block.extend_from_slice(headers.to_string().as_bytes());
        block.extend_from_slice(b"\r\n");
        Ok(ContentStream::buffered(block.freeze()))
    }

    /// Header bytes followed by content bytes.
    pub async fn mime_stream(&self) -> Result<MimeStream<'m, M>> {
        let header = self.header_stream().await?;
        let content = self.content_stream().await?;
        Ok(MimeStream::new(header, content))
    }

    /// Content with its transfer encoding removed.
    pub async fn decoded_content(&self) -> Result<Vec<u8>> {
        let raw = self.content_stream().await?.read_to_end().await?;
        Ok(decode_transfer(self.structure.encoding.as_deref(), &raw)?)
    }

    /// Loads the header cache, at most once per part.
    ///
    /// Concurrent callers wait for the first load. A failed load leaves the
    /// cache empty so a later call retries.
    pub async fn load_headers(&self) -> Result<&Headers> {
        self.headers
            .get_or_try_init(|| async {
                self.message.check_expunged()?;
                let headers = match self.session_revision()? {
                    Revision::Rev1 => Headers::parse_bytes(&self.fetch_mime_section().await?),
                    Revision::Legacy => self.synthesized_headers(),
                };
                tracing::debug!(section = %self.section, count = headers.len(), "headers loaded");
                Ok(headers)
            })
            .await
    }

    /// All header fields.
    pub async fn headers(&self) -> Result<&Headers> {
        self.load_headers().await
    }

    /// All values of header `name`.
    pub async fn header(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.load_headers().await?.get_all(name))
    }

    /// All header fields in order.
    pub async fn all_headers(&self) -> Result<&[Header]> {
        Ok(self.load_headers().await?.all())
    }

    /// Header fields whose name is in `names`.
    pub async fn matching_headers(&self, names: &[&str]) -> Result<Vec<&Header>> {
        Ok(self.load_headers().await?.matching(names))
    }

    /// Header fields whose name is not in `names`.
    pub async fn non_matching_headers(&self, names: &[&str]) -> Result<Vec<&Header>> {
        Ok(self.load_headers().await?.non_matching(names))
    }

    /// All header fields as `Name: value` lines.
    pub async fn all_header_lines(&self) -> Result<Vec<String>> {
        Ok(self.load_headers().await?.lines())
    }

    /// Lines of the header fields whose name is in `names`.
    pub async fn matching_header_lines(&self, names: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .matching_headers(names)
            .await?
            .into_iter()
            .map(Header::line)
            .collect())
    }

    /// Lines of the header fields whose name is not in `names`.
    pub async fn non_matching_header_lines(&self, names: &[&str]) -> Result<Vec<String>> {
        Ok(self
            .non_matching_headers(names)
            .await?
            .into_iter()
            .map(Header::line)
            .collect())
    }

    /// Attachment file name.
    ///
    /// Prefers the disposition `filename` parameter and falls back to the
    /// content-type `name` parameter. Encoded-words are decoded when the
    /// session's configuration asks for it.
    pub fn file_name(&self) -> Result<Option<String>> {
        let name = self
            .structure
            .disposition
            .as_ref()
            .and_then(|disposition| disposition.params.get("filename"))
            .filter(|name| !name.is_empty())
            .or_else(|| self.structure.params.get("name"));

        let Some(name) = name else {
            return Ok(None);
        };

        if self.message.session()?.config().decode_file_name {
            decode_text(name)
                .map(Some)
                .map_err(|err| Error::Decoding(format!("file name {name:?}: {err}")))
        } else {
            Ok(Some(name.to_string()))
        }
    }

    async fn fetch_mime_section(&self) -> Result<Bytes> {
        let section = format!("{}.MIME", self.section);
        match fetch_section(self.message, &section, true, None).await? {
            Some(data) => Ok(data),
            None => {
                reconcile_expunge(self.message, &section).await?;
                Err(Error::FetchFailed("failed to fetch headers".to_string()))
            }
        }
    }

    fn synthesized_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.add("Content-Type", self.content_type());
        headers.add(
            "Content-Transfer-Encoding",
            self.structure.encoding.as_deref().unwrap_or("7BIT"),
        );
        let optional = [
            ("Content-Description", self.structure.description.as_deref()),
            ("Content-ID", self.structure.id.as_deref()),
            ("Content-MD5", self.structure.md5.as_deref()),
        ];
        for (name, value) in optional
            .into_iter()
            .filter_map(|(name, value)| Some((name, value?)))
        {
            headers.add(name, value);
        }
        headers
    }

    fn session_revision(&self) -> Result<Revision> {
        Ok(self.message.session()?.revision())
    }
}

impl<M: MessageHandle> Part for BodyPart<'_, M> {
    fn content_type(&self) -> String {
        self.structure.content_type().to_string()
    }

    fn disposition(&self) -> Option<&str> {
        self.structure
            .disposition
            .as_ref()
            .map(|disposition| disposition.kind.as_str())
    }

    fn encoding(&self) -> Option<&str> {
        self.structure.encoding.as_deref()
    }

    fn content_id(&self) -> Option<&str> {
        self.structure.id.as_deref()
    }

    fn content_md5(&self) -> Option<&str> {
        self.structure.md5.as_deref()
    }

    /// Decoded description, falling back to the raw value.
    fn description(&self) -> Option<&str> {
        self.description
            .get_or_init(|| {
                self.structure
                    .description
                    .as_ref()
                    .map(|raw| decode_text(raw).unwrap_or_else(|_| raw.clone()))
            })
            .as_deref()
    }

    fn size(&self) -> Option<u32> {
        self.structure.size
    }

    fn line_count(&self) -> Option<u32> {
        self.structure.lines
    }
}

impl<M: MessageHandle> std::fmt::Debug for BodyPart<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyPart")
            .field("section", &self.section)
            .field("mime_type", &self.structure.mime_type())
            .field("headers_loaded", &self.headers.initialized())
            .finish_non_exhaustive()
    }
}

fn numbered<'m, M: MessageHandle>(
    message: &'m M,
    children: &'m [BodyStructure],
    prefix: &str,
) -> Vec<BodyPart<'m, M>> {
    children
        .iter()
        .zip(1..)
        .map(|(child, n)| BodyPart::new(message, child, format!("{prefix}{n}")))
        .collect()
}
