//! IMAP command channel over a framed stream.

#![allow(clippy::missing_errors_doc)]

use tokio::io::{AsyncRead, AsyncWrite};

use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{ByteRange, Command, FetchAttribute, TagGenerator};
use crate::parser::{BodyData, FetchItem, Response};
use crate::session::Protocol;
use crate::types::{Capability, SeqNum, Status};
use crate::{Error, Result};

/// [`Protocol`] implementation speaking IMAP over any byte stream.
///
/// The stream must already be authenticated with a mailbox selected.
/// Untagged `EXPUNGE` numbers accumulate until [`take_expunged`] drains
/// them; the mailbox layer should drain them after each command and apply
/// them to its message handles.
///
/// [`take_expunged`]: ImapProtocol::take_expunged
pub struct ImapProtocol<S> {
    stream: FramedStream<S>,
    tag_gen: TagGenerator,
    capabilities: Vec<Capability>,
    expunged: Vec<SeqNum>,
}

impl<S> std::fmt::Debug for ImapProtocol<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapProtocol")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("expunged", &self.expunged)
            .finish_non_exhaustive()
    }
}

impl<S> ImapProtocol<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a stream whose capabilities are already known.
    pub fn new(stream: S, capabilities: Vec<Capability>) -> Self {
        Self {
            stream: FramedStream::new(stream),
            tag_gen: TagGenerator::default(),
            capabilities,
            expunged: Vec::new(),
        }
    }

    /// Reads the server greeting, then asks for capabilities.
    pub async fn from_greeting(stream: S) -> Result<Self> {
        let mut protocol = Self::new(stream, Vec::new());

        let greeting = Response::parse(protocol.stream.read_response().await?)?;
        match greeting.status() {
            Some(Status::Ok | Status::PreAuth) if greeting.is_untagged() => {}
            Some(Status::Bye) => return Err(Error::SessionClosed(greeting.text())),
            _ => {
                return Err(Error::Protocol(format!(
                    "unexpected greeting: {}",
                    greeting.text()
                )));
            }
        }

        protocol.capability().await?;
        Ok(protocol)
    }

    /// Sends CAPABILITY and returns the refreshed list.
    pub async fn capability(&mut self) -> Result<&[Capability]> {
        self.execute(&Command::Capability).await?;
        Ok(&self.capabilities)
    }

    /// Drains the sequence numbers of messages reported expunged.
    ///
    /// Numbers are kept in arrival order, each relative to the mailbox
    /// state at the time it was reported.
    pub fn take_expunged(&mut self) -> Vec<SeqNum> {
        std::mem::take(&mut self.expunged)
    }

    /// Consumes the channel and returns the stream.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// Runs one command through to its tagged completion.
    async fn execute(&mut self, command: &Command) -> Result<Vec<Response>> {
        let tag = self.tag_gen.next();
        tracing::trace!(tag = %tag, command = command.name(), "sending command");

        self.stream.write_command(&command.serialize(&tag)).await?;
        let mut responses = ResponseAccumulator::new(tag)
            .read_until_tagged(&mut self.stream)
            .await?;

        for response in &responses {
            self.absorb_untagged(response);
        }

        let Some(completion) = responses.pop() else {
            return Err(Error::Protocol("missing tagged response".to_string()));
        };
        match completion.status() {
            Some(Status::Ok | Status::PreAuth) => Ok(responses),
            Some(Status::No) => Err(Error::No(completion.text())),
            Some(Status::Bad) => Err(Error::Bad(completion.text())),
            Some(Status::Bye) => Err(Error::SessionClosed(completion.text())),
            None => Err(Error::Protocol("tagged response without status".to_string())),
        }
    }

    /// Records expunges and capability updates carried by untagged data.
    fn absorb_untagged(&mut self, response: &Response) {
        if !response.is_untagged() {
            return;
        }
        if response.key_equals("EXPUNGE") {
            if let Some(sequence) = response.number().and_then(SeqNum::new) {
                tracing::debug!(%sequence, "message expunged");
                self.expunged.push(sequence);
            }
        } else if response.key_equals("CAPABILITY") {
            self.capabilities = response
                .text()
                .split_ascii_whitespace()
                .map(Capability::parse)
                .collect();
        }
    }

    async fn fetch(
        &mut self,
        sequence: SeqNum,
        attribute: FetchAttribute,
    ) -> Result<Option<BodyData>> {
        let section = match &attribute {
            FetchAttribute::Body { section, .. } => section.clone(),
            _ => String::new(),
        };
        let command = Command::Fetch {
            sequence,
            items: vec![attribute],
        };

        for mut response in self.execute(&command).await? {
            if !response.key_equals("FETCH") || response.number() != Some(sequence.get()) {
                continue;
            }
            let body = FetchItem::parse_all(&mut response)?
                .into_iter()
                .filter_map(FetchItem::into_body)
                .find(|body| body.section.eq_ignore_ascii_case(&section));
            if body.is_some() {
                return Ok(body);
            }
        }

        tracing::debug!(%sequence, section, "no body data in FETCH response");
        Ok(None)
    }
}

impl<S> Protocol for ImapProtocol<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    async fn fetch_body(
        &mut self,
        sequence: SeqNum,
        section: &str,
        peek: bool,
    ) -> Result<Option<BodyData>> {
        self.fetch(sequence, FetchAttribute::body(section, peek)).await
    }

    async fn fetch_body_range(
        &mut self,
        sequence: SeqNum,
        section: &str,
        range: ByteRange,
        peek: bool,
    ) -> Result<Option<BodyData>> {
        let attribute = FetchAttribute::Body {
            section: section.to_string(),
            peek,
            partial: Some(range),
        };
        self.fetch(sequence, attribute).await
    }

    async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await.map(drop)
    }
}
