//! Consumer-visible session notifications.

use crate::result::CompletedUpload;
use crate::snapshot::UploadSnapshot;

/// Notifications emitted by an upload session as it progresses.
///
/// Delivered in the order the session observes them on its single control
/// flow. Part notifications arrive in upload-completion order, which is not
/// necessarily part-number order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// The session obtained (or was seeded with) its store session id.
    Ready {
        /// The store-assigned session id.
        session_id: String,
    },
    /// One part finished uploading.
    Part {
        /// The part's 1-based number.
        part_number: u32,
        /// The entity tag the store returned for the part.
        etag: String,
        /// Total bytes handed off for upload so far.
        received_size: u64,
        /// Total bytes acknowledged by the store so far.
        uploaded_size: u64,
    },
    /// A pause was requested; in-flight uploads are still draining.
    Pausing {
        /// Number of uploads still in flight at the time of the request.
        pending_parts: usize,
    },
    /// All in-flight uploads settled; the session is paused.
    Paused {
        /// State sufficient to resume the session later.
        snapshot: UploadSnapshot,
    },
    /// The session resumed after a pause.
    Resumed,
    /// The completion call succeeded; the object is assembled.
    Uploaded {
        /// The store's completion response.
        result: CompletedUpload,
    },
    /// The session failed. The typed error is returned from the suspended
    /// `write`/`finish` call; this carries its rendered message.
    Error {
        /// Human-readable description of the failure.
        message: String,
    },
}
