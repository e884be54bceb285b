//! Shared protocol session.
//!
//! IMAP allows one outstanding command per connection, so every exchange
//! goes through [`Session::lock`]. The guard is held for exactly one
//! command and its response.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tokio::sync::{Mutex, MutexGuard};

use crate::command::ByteRange;
use crate::config::FetchConfig;
use crate::parser::BodyData;
use crate::types::{Capability, SeqNum};
use crate::{Error, Result};

/// Command interface of an established, authenticated connection.
pub trait Protocol: Send {
    /// Capabilities advertised by the server.
    fn capabilities(&self) -> &[Capability];

    /// Fetches a whole body section.
    ///
    /// Returns `None` if the server sent no data for the section.
    fn fetch_body(
        &mut self,
        sequence: SeqNum,
        section: &str,
        peek: bool,
    ) -> impl Future<Output = Result<Option<BodyData>>> + Send;

    /// Fetches part of a body section.
    fn fetch_body_range(
        &mut self,
        sequence: SeqNum,
        section: &str,
        range: ByteRange,
        peek: bool,
    ) -> impl Future<Output = Result<Option<BodyData>>> + Send;

    /// Sends NOOP, giving the server a chance to report expunges.
    fn noop(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Protocol revision, fixed when the session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// `IMAP4rev1` or later: `.MIME` sections and partial fetches.
    Rev1,
    /// Pre-rev1 servers: whole-section fetches and synthesized headers.
    Legacy,
}

impl Revision {
    /// Picks the revision from advertised capabilities.
    #[must_use]
    pub fn from_capabilities(capabilities: &[Capability]) -> Self {
        if capabilities.iter().any(Capability::is_rev1) {
            Self::Rev1
        } else {
            Self::Legacy
        }
    }
}

/// A protocol connection behind the session-wide lock.
#[derive(Debug)]
pub struct Session<P> {
    protocol: Mutex<P>,
    closed: AtomicBool,
    revision: Revision,
    fetch_block_size: AtomicU32,
    config: FetchConfig,
}

impl<P: Protocol> Session<P> {
    /// Wraps a connection, reading its revision from its capabilities.
    pub fn new(protocol: P, config: FetchConfig) -> Self {
        let revision = Revision::from_capabilities(protocol.capabilities());
        tracing::debug!(?revision, "session created");
        Self {
            protocol: Mutex::new(protocol),
            closed: AtomicBool::new(false),
            revision,
            fetch_block_size: AtomicU32::new(config.fetch_block_size.map_or(0, NonZeroU32::get)),
            config,
        }
    }

    /// Acquires exclusive use of the connection.
    ///
    /// Fails with [`Error::SessionClosed`] once the session is closed,
    /// including when it was closed while this call was waiting.
    pub async fn lock(&self) -> Result<MutexGuard<'_, P>> {
        self.ensure_open()?;
        let guard = self.protocol.lock().await;
        self.ensure_open()?;
        Ok(guard)
    }
}

impl<P> Session<P> {
    /// Marks the session closed; later [`lock`](Self::lock) calls fail.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("session closed");
        }
    }

    /// Returns true once the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Protocol revision negotiated at creation.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Current retrieval configuration.
    #[must_use]
    pub fn config(&self) -> FetchConfig {
        FetchConfig {
            fetch_block_size: NonZeroU32::new(self.fetch_block_size.load(Ordering::Relaxed)),
            ..self.config
        }
    }

    /// Changes the block size used by later content streams.
    pub fn set_fetch_block_size(&self, size: Option<NonZeroU32>) {
        self.fetch_block_size
            .store(size.map_or(0, NonZeroU32::get), Ordering::Relaxed);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::SessionClosed("session is closed".to_string()))
        } else {
            Ok(())
        }
    }
}
