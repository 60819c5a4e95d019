//! Destination addressing for uploads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of the object being assembled in the remote store.
///
/// Captured once at construction time and handed to every store call for
/// the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// The bucket (or container) holding the final object.
    pub bucket: String,
    /// The object key within the bucket.
    pub key: String,
}

impl Destination {
    /// Create a new destination.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}
