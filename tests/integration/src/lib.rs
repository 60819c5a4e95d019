//! Integration tests for the partstream upload engine.
//!
//! These tests exercise the public API end-to-end against the in-process
//! [`InMemoryStore`]; no external services are required.

use std::sync::{Arc, Once};

use bytes::Bytes;
use rand::{RngExt, SeedableRng};
use tokio::sync::mpsc::UnboundedReceiver;

use partstream_core::config::UploadConfig;
use partstream_core::store::InMemoryStore;
use partstream_core::uploader::Uploader;
use partstream_model::{Destination, UploadEvent};

/// One mebibyte.
pub const MIB: usize = 1024 * 1024;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Generate a unique destination for a test.
#[must_use]
pub fn test_destination(prefix: &str) -> Destination {
    init_tracing();
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    Destination::new("test-bucket", format!("{prefix}/{id}.bin"))
}

/// Create a fresh store plus a session uploading to a unique destination.
#[must_use]
pub fn test_session(
    prefix: &str,
    config: UploadConfig,
) -> (
    Arc<InMemoryStore>,
    Destination,
    Uploader,
    UnboundedReceiver<UploadEvent>,
) {
    let store = Arc::new(InMemoryStore::new());
    let destination = test_destination(prefix);
    let (uploader, events) = Uploader::new_session(store.clone(), destination.clone(), config);
    (store, destination, uploader, events)
}

/// Deterministic pseudo-random payload of `len` bytes.
#[must_use]
pub fn payload(len: usize) -> Bytes {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x7061_7274);
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf[..]);
    Bytes::from(buf)
}

/// Drain every event currently queued on the receiver.
#[must_use]
pub fn drain_events(events: &mut UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Await events until one matches `pred`, returning everything seen up to
/// and including it.
pub async fn events_until(
    events: &mut UnboundedReceiver<UploadEvent>,
    pred: impl Fn(&UploadEvent) -> bool,
) -> Vec<UploadEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
    seen
}

mod test_failure;
mod test_pause;
mod test_roundtrip;
