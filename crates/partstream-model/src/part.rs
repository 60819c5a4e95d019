//! Part records.
//!
//! A part is a contiguous byte range of the final object, uploaded
//! independently and identified by a 1-based, strictly increasing part
//! number plus the opaque integrity token (etag) the store returned for it.

use serde::{Deserialize, Serialize};

/// A part that has been uploaded and acknowledged by the store.
///
/// Written at most once, at slot `part_number - 1` of the session's part
/// table. A slot is never skipped: a part whose upload fails aborts the
/// whole session rather than leaving a permanent gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    /// The part number (1-based, strictly increasing, no gaps).
    pub part_number: u32,
    /// The entity tag returned by the store for this part.
    pub etag: String,
    /// Size of this part in bytes. Zero for parts seeded from a resume
    /// descriptor, whose sizes the descriptor does not carry.
    pub size: u64,
}

/// The wire form of a part inside a snapshot or resume descriptor.
///
/// Carries only what a later session needs to complete the upload: the
/// part number and the etag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPart {
    /// The part number (1-based).
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// The entity tag returned by the store for this part.
    #[serde(rename = "ETag")]
    pub etag: String,
}

impl From<&PartRecord> for RecordedPart {
    fn from(part: &PartRecord) -> Self {
        Self {
            part_number: part.part_number,
            etag: part.etag.clone(),
        }
    }
}

impl RecordedPart {
    /// Rehydrate a full record from the wire form. The size is unknown.
    #[must_use]
    pub fn into_record(self) -> PartRecord {
        PartRecord {
            part_number: self.part_number,
            etag: self.etag,
            size: 0,
        }
    }
}
