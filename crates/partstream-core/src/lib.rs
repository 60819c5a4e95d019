//! Streaming multipart upload engine.
//!
//! This crate adapts an arbitrary byte stream into a sequence of
//! bounded-size parts uploaded concurrently to a remote object store using
//! the three-phase multipart protocol (initiate, upload-part per part,
//! complete, with abort on failure). A producer writes bytes without
//! knowing the store's part-size limits; the engine buffers, slices,
//! sequences, and dispatches parts, applies backpressure when uploads fall
//! behind, and can pause, resume, and gracefully finalize or abort.
//!
//! # Architecture
//!
//! ```text
//! Uploader (handle: write / finish / pause / resume)
//!        |  command channel
//!        v
//! SessionDriver (single owning task)
//!   ByteAccumulator -> dispatch -> ConcurrencyGate -> JoinSet uploads
//!        |                                               |
//!        v                                               v
//!     Session (part table, counters, state machine)   RemoteStore
//! ```
//!
//! The store client is injected once at construction as an
//! [`Arc<dyn RemoteStore>`](store::RemoteStore); the engine never resolves
//! it through global state.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;
pub mod store;
pub mod uploader;

mod driver;

pub use config::{MIN_PART_SIZE, UploadConfig};
pub use error::{UploadError, UploadResult};
pub use store::RemoteStore;
pub use uploader::Uploader;
