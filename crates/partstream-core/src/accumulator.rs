//! Byte accumulation and part slicing.
//!
//! [`ByteAccumulator`] owns the bytes that have been written but not yet
//! handed off for upload: an ordered queue of immutable [`Bytes`] slices
//! plus a running length counter. Extraction preserves input order with no
//! loss or duplication; bytes absorbed in excess of one part stay queued
//! for the next extraction.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Ordered buffer of not-yet-uploaded bytes.
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl ByteAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer in input order. Empty buffers are dropped.
    pub fn absorb(&mut self, buf: Bytes) {
        if buf.is_empty() {
            return;
        }
        self.len += buf.len();
        self.chunks.push_back(buf);
    }

    /// Number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extract the next part.
    ///
    /// Returns a buffer of exactly `threshold` bytes, or `None` if fewer
    /// are buffered. When `is_final` is true, returns all remaining bytes
    /// instead, which may be fewer than `threshold` (including none).
    pub fn extract_part(&mut self, threshold: usize, is_final: bool) -> Option<Bytes> {
        if is_final {
            return Some(self.take(self.len));
        }
        if self.len < threshold {
            return None;
        }
        Some(self.take(threshold))
    }

    /// Remove and return exactly `want` buffered bytes, in order.
    ///
    /// When the front chunk alone can satisfy the request it is sliced
    /// without copying; otherwise chunks are assembled into one buffer.
    fn take(&mut self, want: usize) -> Bytes {
        if want == 0 {
            return Bytes::new();
        }

        if self.chunks.front().is_some_and(|front| front.len() >= want) {
            let mut front = self.chunks.pop_front().unwrap_or_default();
            let part = front.split_to(want);
            if !front.is_empty() {
                self.chunks.push_front(front);
            }
            self.len -= want;
            return part;
        }

        let mut out = BytesMut::with_capacity(want);
        while out.len() < want {
            let Some(mut chunk) = self.chunks.pop_front() else {
                break;
            };
            let need = want - out.len();
            if chunk.len() > need {
                out.extend_from_slice(&chunk.split_to(need));
                self.chunks.push_front(chunk);
            } else {
                out.extend_from_slice(&chunk);
            }
        }
        self.len -= out.len();
        out.freeze()
    }
}
