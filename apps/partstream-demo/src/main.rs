//! Partstream demo - stream a local file through the upload engine.
//!
//! Reads a file in small chunks, writes them into an upload session backed
//! by the in-memory store, and logs the session notifications as they
//! arrive. Useful for watching the part slicing, backpressure, and
//! finalization behavior without a real object store.
//!
//! # Usage
//!
//! ```text
//! partstream-demo <file> [bucket] [key]
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PARTSTREAM_PART_SIZE` | `5242880` | Part size threshold in bytes |
//! | `PARTSTREAM_CONCURRENT_PARTS` | `1` | Concurrent part uploads |
//! | `RUST_LOG` | `info` | Tracing filter |

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use partstream_core::config::UploadConfig;
use partstream_core::store::InMemoryStore;
use partstream_core::uploader::Uploader;
use partstream_model::{Destination, UploadEvent};

/// Chunk size for reading the input file. Deliberately smaller than any
/// part threshold so the engine does the slicing.
const READ_CHUNK: usize = 1024 * 1024;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Log every session notification until the event channel closes.
async fn watch_events(mut events: tokio::sync::mpsc::UnboundedReceiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Ready { session_id } => info!(%session_id, "session ready"),
            UploadEvent::Part {
                part_number,
                etag,
                received_size,
                uploaded_size,
            } => info!(part_number, %etag, received_size, uploaded_size, "part uploaded"),
            UploadEvent::Pausing { pending_parts } => info!(pending_parts, "pausing"),
            UploadEvent::Paused { snapshot } => {
                info!(parts = snapshot.parts.len(), "paused");
            }
            UploadEvent::Resumed => info!("resumed"),
            UploadEvent::Uploaded { result } => info!(location = %result.location, "uploaded"),
            UploadEvent::Error { message } => tracing::error!(%message, "session error"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: partstream-demo <file> [bucket] [key]")?;
    let bucket = args.next().unwrap_or_else(|| "demo-bucket".to_owned());
    let key = args.next().unwrap_or_else(|| path.clone());

    let config = UploadConfig::from_env();
    info!(
        %path,
        part_size = config.part_size(),
        concurrent_parts = config.concurrent_parts(),
        "starting upload"
    );

    let store = Arc::new(InMemoryStore::new());
    let destination = Destination::new(bucket, key);
    let (mut uploader, events) =
        Uploader::new_session(store.clone(), destination.clone(), config);
    let watcher = tokio::spawn(watch_events(events));

    let mut file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("cannot open {path}"))?;
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        uploader.write(Bytes::copy_from_slice(&buf[..n])).await?;
    }

    match uploader.finish().await? {
        Some(result) => {
            let size = store
                .object(&destination.bucket, &destination.key)
                .map_or(0, |(body, _)| body.len());
            info!(etag = %result.etag, size, "upload complete");
        }
        None => info!("input was empty, nothing uploaded"),
    }

    watcher.await.ok();
    Ok(())
}
