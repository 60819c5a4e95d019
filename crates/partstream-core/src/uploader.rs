//! The producer-facing upload handle.
//!
//! An [`Uploader`] is the writable end of one upload session. Bytes go in
//! through [`Uploader::write`] in whatever chunk sizes the producer has;
//! the session slices them into store-sized parts. `write` suspends while
//! uploads are behind (backpressure) or the session is paused, and
//! [`Uploader::finish`] drains the remainder and completes the session.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use partstream_model::{CompletedUpload, Destination, ResumeDescriptor, UploadEvent};

use crate::config::UploadConfig;
use crate::driver::{Command, SessionDriver};
use crate::error::{UploadError, UploadResult};
use crate::session::Session;
use crate::store::RemoteStore;

/// Handle to a running upload session.
///
/// Constructed with [`Uploader::new_session`] for a fresh upload or
/// [`Uploader::resume_session`] to continue one from a snapshot. Both
/// return the handle together with the receiver of session
/// [notifications](UploadEvent). Dropping the handle without calling
/// [`finish`](Uploader::finish) abandons the session; an initiated,
/// uncompleted session is then aborted best-effort.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use partstream_core::config::UploadConfig;
/// use partstream_core::store::InMemoryStore;
/// use partstream_core::uploader::Uploader;
/// use partstream_model::Destination;
///
/// # async fn example() -> Result<(), partstream_core::UploadError> {
/// let store = Arc::new(InMemoryStore::new());
/// let destination = Destination::new("backups", "2026/archive.tar");
/// let (mut uploader, _events) =
///     Uploader::new_session(store, destination, UploadConfig::default());
///
/// uploader.write(&b"archive bytes"[..]).await?;
/// let result = uploader.finish().await?;
/// assert!(result.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Uploader {
    commands: mpsc::Sender<Command>,
}

impl Uploader {
    /// Start a fresh session uploading to `destination`.
    ///
    /// The store's initiate call is deferred until the first part needs to
    /// be dispatched; a producer that writes nothing never touches the
    /// store at all. Must be called within a tokio runtime.
    #[must_use]
    pub fn new_session(
        store: Arc<dyn RemoteStore>,
        destination: Destination,
        config: UploadConfig,
    ) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let session = Session::new(destination);
        let (commands, events) = SessionDriver::launch(store, session, config);
        (Self { commands }, events)
    }

    /// Resume a session from a prior snapshot.
    ///
    /// No initiate call is made: the supplied session id is used as-is and
    /// part numbering continues after the supplied parts. The `Ready`
    /// notification fires immediately with that id.
    #[must_use]
    pub fn resume_session(
        store: Arc<dyn RemoteStore>,
        destination: Destination,
        resume: ResumeDescriptor,
        config: UploadConfig,
    ) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let session = Session::resumed(destination, resume);
        let (commands, events) = SessionDriver::launch(store, session, config);
        (Self { commands }, events)
    }

    /// Write a chunk of the object's bytes, in input order.
    ///
    /// Suspends while the session applies backpressure (buffered parts
    /// waiting for upload slots) or is paused. Returns an error if the
    /// session has failed; the session is then unusable.
    pub async fn write(&mut self, data: impl Into<Bytes>) -> UploadResult<()> {
        let (ack, response) = oneshot::channel();
        self.commands
            .send(Command::Write {
                data: data.into(),
                ack,
            })
            .await
            .map_err(|_| UploadError::Closed)?;
        response.await.map_err(|_| UploadError::Closed)?
    }

    /// Signal end-of-input and finalize the session.
    ///
    /// Drains buffered bytes as a final (possibly undersized) part, waits
    /// for every in-flight upload to settle, and issues the completion
    /// call. Returns `Ok(None)` when zero bytes were written on a fresh
    /// session: nothing was created, so nothing is completed.
    pub async fn finish(self) -> UploadResult<Option<CompletedUpload>> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Finish { reply })
            .await
            .map_err(|_| UploadError::Closed)?;
        response.await.map_err(|_| UploadError::Closed)?
    }

    /// Request a pause.
    ///
    /// Returns `false` if the session has not started or is already
    /// pausing or paused. In-flight uploads drain first; the `Paused`
    /// notification carries the resumable snapshot once they have.
    pub async fn pause(&self) -> bool {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(Command::Pause { reply })
            .await
            .is_err()
        {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Resume a paused session, releasing held writes and dispatches.
    ///
    /// Returns `false` unless the session is currently paused.
    pub async fn resume(&self) -> bool {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(Command::Resume { reply })
            .await
            .is_err()
        {
            return false;
        }
        response.await.unwrap_or(false)
    }
}
