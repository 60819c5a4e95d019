//! The remote store capability.
//!
//! The engine treats the store's wire protocol as opaque: everything it
//! needs is the four primitives below, injected once at construction as an
//! `Arc<dyn RemoteStore>`. Authentication, per-call timeouts, and any
//! retry policy inside a single call are the client's concern, not this
//! layer's.

use async_trait::async_trait;
use bytes::Bytes;
use partstream_model::{CompletedUpload, Destination, PartRecord};

pub mod memory;

pub use memory::InMemoryStore;

/// The four primitive operations of the multipart protocol.
///
/// `#[async_trait]` keeps the trait object-safe so sessions can hold an
/// `Arc<dyn RemoteStore>`.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Begin a multipart session for `destination`, returning its id.
    async fn initiate_upload(&self, destination: &Destination) -> anyhow::Result<String>;

    /// Upload one part, returning the store's etag for it.
    async fn upload_part(
        &self,
        destination: &Destination,
        session_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> anyhow::Result<String>;

    /// Assemble the uploaded parts, listed in part-number order, into the
    /// final object.
    async fn complete_upload(
        &self,
        destination: &Destination,
        session_id: &str,
        parts: &[PartRecord],
    ) -> anyhow::Result<CompletedUpload>;

    /// Discard the session and any parts the store accepted for it.
    async fn abort_upload(&self, destination: &Destination, session_id: &str)
    -> anyhow::Result<()>;
}
