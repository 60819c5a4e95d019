//! Resumable session state.
//!
//! [`UploadSnapshot`] is the persisted form emitted when a session pauses:
//! the minimal state sufficient, together with the destination address, to
//! reconstruct a resumable session in a different process later.
//! [`ResumeDescriptor`] is the same information in the store's wire style,
//! accepted at construction time of a resumed session.

use serde::{Deserialize, Serialize};

use crate::part::RecordedPart;

/// Snapshot of a paused session, suitable for external persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSnapshot {
    /// The store-assigned session id.
    pub session_id: String,
    /// Parts recorded so far, in part-number order.
    pub parts: Vec<RecordedPart>,
    /// Total bytes acknowledged by the store so far in this process.
    pub uploaded_size: u64,
}

impl UploadSnapshot {
    /// Convert this snapshot into a descriptor for resuming the session.
    #[must_use]
    pub fn into_resume(self) -> ResumeDescriptor {
        ResumeDescriptor {
            upload_id: self.session_id,
            parts: self.parts,
        }
    }
}

/// Descriptor accepted at construction time to resume a prior session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeDescriptor {
    /// The session id of the upload to resume.
    #[serde(rename = "UploadId")]
    pub upload_id: String,
    /// Parts already uploaded by the prior session, in part-number order.
    #[serde(rename = "Parts")]
    pub parts: Vec<RecordedPart>,
}

impl ResumeDescriptor {
    /// Create a descriptor from a session id and prior parts.
    #[must_use]
    pub fn new(upload_id: impl Into<String>, parts: Vec<RecordedPart>) -> Self {
        Self {
            upload_id: upload_id.into(),
            parts,
        }
    }
}
