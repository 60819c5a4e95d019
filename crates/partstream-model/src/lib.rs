//! Data types for the partstream multipart upload adapter.
//!
//! This crate holds the plain data shared between the upload engine and its
//! consumers: the destination address, part records, the resumable snapshot
//! wire format, the completion result, and the consumer-visible event enum.
//! No I/O happens here; the engine lives in `partstream-core`.

mod destination;
mod event;
mod part;
mod result;
mod snapshot;

pub use destination::Destination;
pub use event::UploadEvent;
pub use part::{PartRecord, RecordedPart};
pub use result::CompletedUpload;
pub use snapshot::{ResumeDescriptor, UploadSnapshot};
