//! Concurrency gating for in-flight part uploads.

/// Bounds the number of simultaneously in-flight part uploads.
///
/// Invariant: `0 <= pending <= limit` at all times. The gate only counts;
/// queueing of dispatches that could not acquire a slot is handled by the
/// session driver, which releases exactly one waiter per freed slot.
#[derive(Debug)]
pub struct ConcurrencyGate {
    limit: usize,
    pending: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting up to `limit` concurrent uploads.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            pending: 0,
        }
    }

    /// Claim a slot. Returns `false` if the gate is at its limit.
    pub fn try_acquire(&mut self) -> bool {
        if self.pending < self.limit {
            self.pending += 1;
            true
        } else {
            false
        }
    }

    /// Return a slot after an upload settles.
    pub fn release(&mut self) {
        debug_assert!(self.pending > 0, "release without matching acquire");
        self.pending = self.pending.saturating_sub(1);
    }

    /// Number of uploads currently in flight.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Whether no uploads are in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending == 0
    }

    /// The configured concurrency limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}
