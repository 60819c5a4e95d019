//! Session state.
//!
//! A [`Session`] tracks one multipart-upload lifecycle: the store-assigned
//! id, the part counter, the index-addressed part table, byte counters,
//! and the state machine position. It is owned exclusively by the session
//! driver task and mutated only on that single control flow, so it needs
//! no locking.

use chrono::{DateTime, Utc};
use partstream_model::{Destination, PartRecord, RecordedPart, ResumeDescriptor, UploadSnapshot};

/// Position of a session in its lifecycle.
///
/// `Uninitialized → Initiating → Active → Draining → Completing →
/// Completed`, with `Aborting → Failed` reachable from `Initiating`,
/// `Active`, `Draining`, or `Completing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No store call has been made yet.
    Uninitialized,
    /// The initiate call is outstanding.
    Initiating,
    /// The session id is known; parts may be dispatched.
    Active,
    /// End-of-input received; buffered bytes are being flushed.
    Draining,
    /// The completion call is outstanding.
    Completing,
    /// The object was assembled. Terminal.
    Completed,
    /// The abort call is outstanding after a failure.
    Aborting,
    /// The session failed. Terminal.
    Failed,
}

impl SessionState {
    /// Whether no further transition can occur.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Position of the pause controller, layered on top of [`SessionState`].
///
/// `Pausing` is held only while in-flight uploads are still draining; the
/// transition to `Paused` fires exactly when the last of them settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    /// Normal operation.
    Active,
    /// Pause requested; in-flight uploads still draining.
    Pausing,
    /// All in-flight uploads settled; new work is held.
    Paused,
}

/// One multipart-upload lifecycle.
#[derive(Debug)]
pub struct Session {
    /// Destination of the final object.
    pub destination: Destination,
    /// Store-assigned session id, once obtained or seeded from a resume.
    pub session_id: Option<String>,
    /// State machine position.
    pub state: SessionState,
    /// Pause controller position.
    pub pause: PauseState,
    /// Total bytes handed off for upload.
    pub received_size: u64,
    /// Total bytes acknowledged by the store.
    pub uploaded_size: u64,
    /// When this session object was created.
    pub initiated: DateTime<Utc>,
    /// Next part number to assign (1-based).
    part_counter: u32,
    /// Completed parts, indexed by `part_number - 1`.
    parts: Vec<Option<PartRecord>>,
}

impl Session {
    /// Create a fresh session for `destination`.
    #[must_use]
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            session_id: None,
            state: SessionState::Uninitialized,
            pause: PauseState::Active,
            received_size: 0,
            uploaded_size: 0,
            initiated: Utc::now(),
            part_counter: 1,
            parts: Vec::new(),
        }
    }

    /// Create a session seeded from a resume descriptor.
    ///
    /// Skips initiation entirely: the supplied session id is taken as-is
    /// and part numbering continues at `prior parts + 1`.
    #[must_use]
    pub fn resumed(destination: Destination, resume: ResumeDescriptor) -> Self {
        let mut parts: Vec<Option<PartRecord>> = Vec::with_capacity(resume.parts.len());
        for prior_part in resume.parts {
            let record = prior_part.into_record();
            let slot = (record.part_number - 1) as usize;
            if parts.len() <= slot {
                parts.resize(slot + 1, None);
            }
            parts[slot] = Some(record);
        }
        let prior = u32::try_from(parts.len()).unwrap_or(u32::MAX);
        Self {
            destination,
            session_id: Some(resume.upload_id),
            state: SessionState::Active,
            pause: PauseState::Active,
            received_size: 0,
            uploaded_size: 0,
            initiated: Utc::now(),
            part_counter: prior + 1,
            parts,
        }
    }

    /// Whether the session has obtained (or was seeded with) a session id.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.session_id.is_some()
    }

    /// Assign the next part number.
    ///
    /// Numbers are strictly increasing with no gaps, assigned at the
    /// moment of dispatch in input order.
    pub fn next_part_number(&mut self) -> u32 {
        let number = self.part_counter;
        self.part_counter += 1;
        number
    }

    /// The next part number that would be assigned.
    #[must_use]
    pub fn part_counter(&self) -> u32 {
        self.part_counter
    }

    /// Record a completed part at slot `part_number - 1`.
    ///
    /// Slots are written at most once; completion arrival order does not
    /// matter because assembly reads the table in index order.
    pub fn record_part(&mut self, part: PartRecord) {
        let slot = (part.part_number - 1) as usize;
        if self.parts.len() <= slot {
            self.parts.resize(slot + 1, None);
        }
        debug_assert!(self.parts[slot].is_none(), "part slot written twice");
        self.parts[slot] = Some(part);
    }

    /// Number of parts recorded so far.
    #[must_use]
    pub fn parts_recorded(&self) -> usize {
        self.parts.iter().flatten().count()
    }

    /// All recorded parts in part-number order.
    #[must_use]
    pub fn ordered_parts(&self) -> Vec<PartRecord> {
        self.parts.iter().flatten().cloned().collect()
    }

    /// Snapshot of the session for external persistence.
    ///
    /// `None` until a session id exists; there is nothing to resume before
    /// that.
    #[must_use]
    pub fn snapshot(&self) -> Option<UploadSnapshot> {
        let session_id = self.session_id.clone()?;
        let parts = self
            .parts
            .iter()
            .flatten()
            .map(RecordedPart::from)
            .collect();
        Some(UploadSnapshot {
            session_id,
            parts,
            uploaded_size: self.uploaded_size,
        })
    }
}
