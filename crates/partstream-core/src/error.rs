//! Error types for upload sessions.
//!
//! Each variant corresponds to one phase of the multipart protocol. The
//! engine never retries internally: a failed part upload or completion is
//! fatal to the session and routes through the abort path, after which the
//! session is terminal. Callers needing resilience resume a fresh session
//! from the last snapshot.

/// Error produced by an upload session.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The initiate call failed. Nothing was created in the store, so no
    /// cleanup call is made.
    #[error("failed to initiate multipart session: {source}")]
    Initiation {
        /// The store client's error.
        #[source]
        source: anyhow::Error,
    },

    /// One part's upload call failed. The session aborts.
    #[error("failed to upload part {part_number}: {source}")]
    PartUpload {
        /// The part whose upload failed.
        part_number: u32,
        /// The store client's error.
        #[source]
        source: anyhow::Error,
    },

    /// The completion call failed. The session aborts.
    #[error("failed to complete multipart session {session_id}: {source}")]
    Completion {
        /// The session that could not be completed.
        session_id: String,
        /// The store client's error.
        #[source]
        source: anyhow::Error,
    },

    /// The abort call itself failed while cleaning up after `original`.
    /// Both failures are reported; neither is silently swallowed.
    #[error("abort failed ({source}) while handling: {original}")]
    Abort {
        /// The failure that triggered the abort.
        original: Box<UploadError>,
        /// The store client's error from the abort call.
        #[source]
        source: anyhow::Error,
    },

    /// An operation was issued against a session that already failed.
    #[error("upload session already failed: {message}")]
    SessionFailed {
        /// Rendered message of the failure that ended the session.
        message: String,
    },

    /// The session's driver task is gone (the session already finished or
    /// was shut down).
    #[error("upload session is closed")]
    Closed,
}

impl UploadError {
    /// The error to hand to any further operation on a failed session.
    #[must_use]
    pub fn already_failed(&self) -> Self {
        Self::SessionFailed {
            message: self.to_string(),
        }
    }
}

/// Convenience result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;
