//! Owning-message interface and the fetch path shared by parts and streams.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;

use bytes::Bytes;

use crate::command::ByteRange;
use crate::session::{Protocol, Session};
use crate::types::SeqNum;
use crate::{Error, Result};

/// The message a body part belongs to.
///
/// Implemented by the mailbox layer, which tracks expunges and owns the
/// session.
pub trait MessageHandle: Sync {
    /// Connection type of the owning session.
    type Protocol: Protocol;

    /// Session the message was read from.
    ///
    /// Fails with [`Error::SessionClosed`] if there is no usable session.
    fn session(&self) -> Result<&Session<Self::Protocol>>;

    /// Current sequence number of the message.
    fn sequence_number(&self) -> Result<SeqNum>;

    /// Fails with [`Error::MessageRemoved`] if the message is known to be
    /// expunged.
    fn check_expunged(&self) -> Result<()>;

    /// Asks the server for pending expunges, then checks this message.
    fn force_check_expunged(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            let session = self.session()?;
            session.lock().await?.noop().await?;
            self.check_expunged()
        }
    }

    /// Whether fetches should leave `\Seen` untouched.
    fn peek(&self) -> bool {
        self.session().is_ok_and(|session| session.config().peek)
    }
}

/// Fetches a body section on behalf of `message`, mapping failures.
///
/// A message already known to be expunged fails with
/// [`Error::MessageRemoved`] before any command is sent. `Ok(None)` means
/// the server returned no data for the section.
pub(crate) async fn fetch_section<M: MessageHandle>(
    message: &M,
    section: &str,
    peek: bool,
    range: Option<ByteRange>,
) -> Result<Option<Bytes>> {
    let result = async {
        let session = message.session()?;
        let sequence = message.sequence_number()?;
        let mut protocol = session.lock().await?;
        message.check_expunged()?;
        match range {
            Some(range) => {
                protocol
                    .fetch_body_range(sequence, section, range, peek)
                    .await
            }
            None => protocol.fetch_body(sequence, section, peek).await,
        }
    }
    .await;

    match result {
        Ok(body) => Ok(body.and_then(|body| body.data)),
        Err(err) => Err(classify_failure(message, err)),
    }
}

/// Re-checks expunge state after a fetch came back empty.
pub(crate) async fn reconcile_expunge<M: MessageHandle>(message: &M, section: &str) -> Result<()> {
    tracing::debug!(section, "empty fetch, checking for expunge");
    message
        .force_check_expunged()
        .await
        .map_err(|err| classify_failure(message, err))
}

/// Maps a failed exchange onto the retrieval error taxonomy.
///
/// Connection loss closes the session and becomes [`Error::SessionClosed`],
/// unless the message turns out to have been expunged.
pub(crate) fn classify_failure<M: MessageHandle>(message: &M, err: Error) -> Error {
    match err {
        Error::MessageRemoved => Error::MessageRemoved,
        err if err.is_connection_lost() => {
            if let Ok(session) = message.session() {
                session.close();
            }
            if let Err(removed @ Error::MessageRemoved) = message.check_expunged() {
                return removed;
            }
            tracing::warn!(error = %err, "connection lost during fetch");
            match err {
                Error::SessionClosed(text) => Error::SessionClosed(text),
                other => Error::SessionClosed(other.to_string()),
            }
        }
        err => {
            tracing::warn!(error = %err, "fetch failed");
            Error::Protocol(err.to_string())
        }
    }
}
