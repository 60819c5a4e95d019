//! In-memory remote store.
//!
//! A self-contained [`RemoteStore`] that keeps sessions and assembled
//! objects in process memory. It exists for two audiences: demos that want
//! the full upload flow without a real store, and tests, for which it adds
//! fault injection, call counters, an optional per-part delay, and a
//! peak-in-flight gauge.
//!
//! Etags follow the store convention: quoted hex MD5 per part, and a
//! composite `"<md5-of-part-md5s>-<count>"` etag for the assembled object.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use md5::Digest;
use rand::RngExt;
use tracing::debug;

use partstream_model::{CompletedUpload, Destination, PartRecord};

use super::RemoteStore;

/// A part held by an in-progress session.
#[derive(Debug, Clone)]
struct StoredPart {
    etag: String,
    data: Bytes,
}

/// An in-progress multipart session.
#[derive(Debug, Default)]
struct StoredSession {
    parts: BTreeMap<u32, StoredPart>,
}

/// In-memory implementation of the [`RemoteStore`] capability.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: DashMap<String, StoredSession>,
    objects: DashMap<(String, String), (Bytes, String)>,

    // Fault injection (all off by default).
    fail_initiate: AtomicBool,
    fail_part_number: AtomicU32,
    fail_complete: AtomicBool,
    fail_abort: AtomicBool,

    // Instrumentation.
    part_delay_millis: AtomicU64,
    initiate_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    abort_calls: DashMap<String, usize>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Fault injection & instrumentation
    // -----------------------------------------------------------------------

    /// Make the next initiate calls fail.
    pub fn fail_initiate(&self) {
        self.fail_initiate.store(true, Ordering::SeqCst);
    }

    /// Make uploads of the given part number fail.
    pub fn fail_part(&self, part_number: u32) {
        self.fail_part_number.store(part_number, Ordering::SeqCst);
    }

    /// Make completion calls fail.
    pub fn fail_complete(&self) {
        self.fail_complete.store(true, Ordering::SeqCst);
    }

    /// Make abort calls fail.
    pub fn fail_abort(&self) {
        self.fail_abort.store(true, Ordering::SeqCst);
    }

    /// Delay part uploads by a multiple of `delay` (1x to 3x, varying by
    /// part number), giving tests a window in which uploads are reliably
    /// in flight and making completions arrive out of part-number order.
    pub fn set_part_delay(&self, delay: Duration) {
        self.part_delay_millis
            .store(delay.as_millis().min(u128::from(u64::MAX)) as u64, Ordering::SeqCst);
    }

    /// Bytes and etag of an assembled object, if completion ran.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .get(&(bucket.to_owned(), key.to_owned()))
            .map(|entry| entry.clone())
    }

    /// Number of sessions currently in progress.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Total initiate calls observed.
    #[must_use]
    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    /// Total part-upload calls observed.
    #[must_use]
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Total completion calls observed.
    #[must_use]
    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Abort calls observed for the given session id.
    #[must_use]
    pub fn abort_calls_for(&self, session_id: &str) -> usize {
        self.abort_calls.get(session_id).map_or(0, |c| *c)
    }

    /// Abort calls observed across all sessions.
    #[must_use]
    pub fn abort_calls_total(&self) -> usize {
        self.abort_calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Highest number of simultaneously in-flight part uploads observed.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Random 64-character hex session id.
fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let mut buf = [0u8; 32];
    rng.fill(&mut buf);
    hex::encode(buf)
}

/// Quoted hex MD5 of `data`, the per-part etag convention.
fn compute_etag(data: &[u8]) -> String {
    let digest = md5::Md5::digest(data);
    format!("\"{}\"", hex::encode(digest))
}

/// Composite etag of an assembled object: MD5 of the concatenated binary
/// part digests, suffixed with the part count.
fn compute_composite_etag(part_etags: &[&str]) -> String {
    let mut combined = Vec::with_capacity(part_etags.len() * 16);
    for etag in part_etags {
        if let Ok(bytes) = hex::decode(etag.trim_matches('"')) {
            combined.extend_from_slice(&bytes);
        }
    }
    let digest = hex::encode(md5::Md5::digest(&combined));
    format!("\"{digest}-{}\"", part_etags.len())
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn initiate_upload(&self, destination: &Destination) -> anyhow::Result<String> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initiate.load(Ordering::SeqCst) {
            bail!("initiate refused for {destination}");
        }

        let session_id = generate_session_id();
        self.sessions
            .insert(session_id.clone(), StoredSession::default());

        debug!(%destination, session_id = %session_id, "initiated session");
        Ok(session_id)
    }

    async fn upload_part(
        &self,
        destination: &Destination,
        session_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> anyhow::Result<String> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.part_delay_millis.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay * u64::from(part_number % 3 + 1))).await;
        }

        let result = self.store_part(destination, session_id, part_number, body);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn complete_upload(
        &self,
        destination: &Destination,
        session_id: &str,
        parts: &[PartRecord],
    ) -> anyhow::Result<CompletedUpload> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_complete.load(Ordering::SeqCst) {
            bail!("completion refused for session {session_id}");
        }

        let Some((_, session)) = self.sessions.remove(session_id) else {
            bail!("no such session: {session_id}");
        };

        let mut body = BytesMut::new();
        let mut etags = Vec::with_capacity(parts.len());
        let mut last_number = 0;
        for part in parts {
            if part.part_number <= last_number {
                bail!("part list not in ascending order");
            }
            last_number = part.part_number;

            let Some(stored) = session.parts.get(&part.part_number) else {
                bail!("part {} was never uploaded", part.part_number);
            };
            body.extend_from_slice(&stored.data);
            etags.push(stored.etag.as_str());
        }

        let etag = compute_composite_etag(&etags);
        let body = body.freeze();
        debug!(
            %destination,
            session_id = %session_id,
            parts = parts.len(),
            size = body.len(),
            "assembled object"
        );
        self.objects.insert(
            (destination.bucket.clone(), destination.key.clone()),
            (body, etag.clone()),
        );

        Ok(CompletedUpload {
            bucket: destination.bucket.clone(),
            key: destination.key.clone(),
            etag,
            location: format!("memory://{destination}"),
        })
    }

    async fn abort_upload(
        &self,
        destination: &Destination,
        session_id: &str,
    ) -> anyhow::Result<()> {
        *self
            .abort_calls
            .entry(session_id.to_owned())
            .or_insert(0) += 1;
        if self.fail_abort.load(Ordering::SeqCst) {
            bail!("abort refused for session {session_id}");
        }

        self.sessions.remove(session_id);
        debug!(%destination, session_id = %session_id, "aborted session");
        Ok(())
    }
}

impl InMemoryStore {
    fn store_part(
        &self,
        destination: &Destination,
        session_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> anyhow::Result<String> {
        if self.fail_part_number.load(Ordering::SeqCst) == part_number {
            bail!("upload refused for part {part_number}");
        }

        let Some(mut session) = self.sessions.get_mut(session_id) else {
            bail!("no such session: {session_id}");
        };

        let etag = compute_etag(&body);
        debug!(
            %destination,
            session_id = %session_id,
            part_number,
            size = body.len(),
            "stored part"
        );
        session.parts.insert(
            part_number,
            StoredPart {
                etag: etag.clone(),
                data: body,
            },
        );
        Ok(etag)
    }
}
