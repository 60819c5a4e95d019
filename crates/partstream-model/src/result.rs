//! Completion result.

use serde::{Deserialize, Serialize};

/// The store's response to a successful completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedUpload {
    /// Bucket of the assembled object.
    pub bucket: String,
    /// Key of the assembled object.
    pub key: String,
    /// Entity tag of the assembled object.
    pub etag: String,
    /// Store-reported location of the assembled object.
    pub location: String,
}
