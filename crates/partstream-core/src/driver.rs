//! The session driver task.
//!
//! One driver task owns a [`Session`] and is the session's single control
//! flow: producer commands arrive over an mpsc channel, upload completions
//! over a [`JoinSet`], and both are multiplexed with `select!`. Because
//! every counter and the part table are touched only here, the session
//! needs no locking.
//!
//! Dispatch assigns part numbers in the exact order parts are extracted
//! from the accumulator (input order). When the concurrency gate is at its
//! limit, or a pause is in effect, a numbered part waits in a FIFO queue;
//! each settled upload frees one slot and releases exactly one waiter:
//! the queue front, or a blocked write once the queue is empty.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use partstream_model::{CompletedUpload, PartRecord, UploadEvent};

use crate::accumulator::ByteAccumulator;
use crate::config::UploadConfig;
use crate::error::{UploadError, UploadResult};
use crate::gate::ConcurrencyGate;
use crate::session::{PauseState, Session, SessionState};
use crate::store::RemoteStore;

/// Producer-side commands accepted by the driver.
pub(crate) enum Command {
    Write {
        data: Bytes,
        ack: oneshot::Sender<UploadResult<()>>,
    },
    Finish {
        reply: oneshot::Sender<UploadResult<Option<CompletedUpload>>>,
    },
    Pause {
        reply: oneshot::Sender<bool>,
    },
    Resume {
        reply: oneshot::Sender<bool>,
    },
}

/// What one upload task reports back when it settles.
struct PartOutcome {
    part_number: u32,
    size: u64,
    result: anyhow::Result<String>,
}

/// A numbered part waiting for a free slot (or for resume).
struct QueuedPart {
    part_number: u32,
    body: Bytes,
}

pub(crate) struct SessionDriver {
    store: Arc<dyn RemoteStore>,
    config: UploadConfig,
    session: Session,
    accumulator: ByteAccumulator,
    gate: ConcurrencyGate,
    queued: VecDeque<QueuedPart>,
    held_writes: VecDeque<oneshot::Sender<UploadResult<()>>>,
    in_flight: JoinSet<PartOutcome>,
    events: mpsc::UnboundedSender<UploadEvent>,
    commands: mpsc::Receiver<Command>,
    failure: Option<UploadError>,
}

impl SessionDriver {
    /// Spawn the driver task for `session`.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn launch(
        store: Arc<dyn RemoteStore>,
        session: Session,
        config: UploadConfig,
    ) -> (
        mpsc::Sender<Command>,
        mpsc::UnboundedReceiver<UploadEvent>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let gate = ConcurrencyGate::new(config.concurrent_parts());

        let driver = Self {
            store,
            config,
            session,
            accumulator: ByteAccumulator::new(),
            gate,
            queued: VecDeque::new(),
            held_writes: VecDeque::new(),
            in_flight: JoinSet::new(),
            events: event_tx,
            commands: cmd_rx,
            failure: None,
        };
        tokio::spawn(driver.run());

        (cmd_tx, event_rx)
    }

    async fn run(mut self) {
        // Resume fast path: the seeded session id is ready immediately.
        if let Some(id) = self.session.session_id.clone() {
            debug!(session_id = %id, part_counter = self.session.part_counter(), "resumed session");
            self.emit(UploadEvent::Ready { session_id: id });
        }

        loop {
            tokio::select! {
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.on_settled(joined).await;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Write { data, ack }) => self.on_write(data, ack).await,
                    Some(Command::Finish { reply }) => {
                        self.on_finish(reply).await;
                        return;
                    }
                    Some(Command::Pause { reply }) => self.on_pause(reply),
                    Some(Command::Resume { reply }) => self.on_resume(reply),
                    None => {
                        self.on_disconnect().await;
                        return;
                    }
                },
            }
        }
    }

    fn emit(&self, event: UploadEvent) {
        // The consumer may have dropped its receiver; that is its choice.
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Writes and dispatch
    // -----------------------------------------------------------------------

    async fn on_write(&mut self, data: Bytes, ack: oneshot::Sender<UploadResult<()>>) {
        if let Some(err) = &self.failure {
            let _ = ack.send(Err(err.already_failed()));
            return;
        }

        self.accumulator.absorb(data);
        self.pump().await;

        if let Some(err) = &self.failure {
            let _ = ack.send(Err(err.already_failed()));
            return;
        }

        // Backpressure: hold the acknowledgement while dispatches sit in
        // the queue (gate at limit) or while paused. One waiter is
        // released per freed slot; resume releases all of them.
        if self.session.pause == PauseState::Active && self.queued.is_empty() {
            let _ = ack.send(Ok(()));
        } else {
            self.held_writes.push_back(ack);
        }
    }

    /// Dispatch every extractable full-size part, in input order.
    async fn pump(&mut self) {
        while self.failure.is_none() && self.accumulator.len() >= self.config.part_size() {
            let Some(body) = self.accumulator.extract_part(self.config.part_size(), false) else {
                break;
            };
            self.dispatch(body).await;
        }
    }

    async fn dispatch(&mut self, body: Bytes) {
        if self.ensure_ready().await.is_err() {
            return;
        }

        let part_number = self.session.next_part_number();
        self.session.received_size += body.len() as u64;

        if self.session.pause == PauseState::Active && self.gate.try_acquire() {
            self.spawn_upload(part_number, body);
        } else {
            self.queued.push_back(QueuedPart { part_number, body });
        }
    }

    /// Obtain a session id on the first need to dispatch.
    async fn ensure_ready(&mut self) -> Result<(), ()> {
        if self.session.has_started() {
            return Ok(());
        }

        let after = match self.session.state {
            SessionState::Uninitialized => SessionState::Active,
            state => state,
        };
        self.session.state = SessionState::Initiating;
        debug!(destination = %self.session.destination, "initiating session");

        match self.store.initiate_upload(&self.session.destination).await {
            Ok(id) => {
                self.session.session_id = Some(id.clone());
                self.session.state = after;
                self.emit(UploadEvent::Ready { session_id: id });
                Ok(())
            }
            Err(source) => {
                // Nothing was created in the store: fail without abort.
                let err = UploadError::Initiation { source };
                warn!(error = %err, "session failed");
                self.session.state = SessionState::Failed;
                self.emit(UploadEvent::Error {
                    message: err.to_string(),
                });
                self.fail_waiters(&err);
                self.failure = Some(err);
                Err(())
            }
        }
    }

    fn spawn_upload(&mut self, part_number: u32, body: Bytes) {
        let store = Arc::clone(&self.store);
        let destination = self.session.destination.clone();
        let session_id = self.session.session_id.clone().unwrap_or_default();
        let size = body.len() as u64;

        debug!(part_number, size, pending = self.gate.pending(), "dispatching part");
        self.in_flight.spawn(async move {
            let result = store
                .upload_part(&destination, &session_id, part_number, body)
                .await;
            PartOutcome {
                part_number,
                size,
                result,
            }
        });
    }

    // -----------------------------------------------------------------------
    // Upload completions
    // -----------------------------------------------------------------------

    async fn on_settled(&mut self, joined: Result<PartOutcome, JoinError>) {
        self.gate.release();

        let outcome = joined.unwrap_or_else(|e| PartOutcome {
            part_number: 0,
            size: 0,
            result: Err(anyhow::Error::new(e).context("upload task aborted")),
        });

        match outcome.result {
            Ok(etag) => {
                self.session.record_part(PartRecord {
                    part_number: outcome.part_number,
                    etag: etag.clone(),
                    size: outcome.size,
                });
                self.session.uploaded_size += outcome.size;
                debug!(
                    part_number = outcome.part_number,
                    uploaded_size = self.session.uploaded_size,
                    "part uploaded"
                );
                self.emit(UploadEvent::Part {
                    part_number: outcome.part_number,
                    etag,
                    received_size: self.session.received_size,
                    uploaded_size: self.session.uploaded_size,
                });
                self.release_one_waiter();
                self.maybe_finish_pausing();
            }
            Err(source) => {
                let err = UploadError::PartUpload {
                    part_number: outcome.part_number,
                    source,
                };
                let err = self.abort_session(err).await;
                self.fail_waiters(&err);
                self.failure = Some(err);
            }
        }
    }

    /// A slot was freed: release exactly one waiter.
    fn release_one_waiter(&mut self) {
        if self.session.pause != PauseState::Active {
            return;
        }
        if let Some(next) = self.queued.pop_front() {
            if self.gate.try_acquire() {
                self.spawn_upload(next.part_number, next.body);
            } else {
                self.queued.push_front(next);
            }
        } else if let Some(ack) = self.held_writes.pop_front() {
            let _ = ack.send(Ok(()));
        }
    }

    /// Spawn queued dispatches into however many slots are free.
    fn refill(&mut self) {
        while let Some(next) = self.queued.pop_front() {
            if self.gate.try_acquire() {
                self.spawn_upload(next.part_number, next.body);
            } else {
                self.queued.push_front(next);
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pause / resume
    // -----------------------------------------------------------------------

    fn on_pause(&mut self, reply: oneshot::Sender<bool>) {
        let accepted = self.session.pause == PauseState::Active
            && self.session.has_started()
            && !self.session.state.is_terminal();
        if !accepted {
            let _ = reply.send(false);
            return;
        }

        self.session.pause = PauseState::Pausing;
        debug!(pending = self.gate.pending(), "pausing session");
        self.emit(UploadEvent::Pausing {
            pending_parts: self.gate.pending(),
        });
        self.maybe_finish_pausing();
        let _ = reply.send(true);
    }

    fn maybe_finish_pausing(&mut self) {
        if self.session.pause == PauseState::Pausing && self.gate.is_idle() {
            self.session.pause = PauseState::Paused;
            debug!("session paused");
            if let Some(snapshot) = self.session.snapshot() {
                self.emit(UploadEvent::Paused { snapshot });
            }
        }
    }

    fn on_resume(&mut self, reply: oneshot::Sender<bool>) {
        if self.session.pause != PauseState::Paused {
            let _ = reply.send(false);
            return;
        }

        self.session.pause = PauseState::Active;
        debug!("session resumed");
        self.emit(UploadEvent::Resumed);
        self.refill();
        for ack in self.held_writes.drain(..) {
            let _ = ack.send(Ok(()));
        }
        let _ = reply.send(true);
    }

    // -----------------------------------------------------------------------
    // Drain and finalization
    // -----------------------------------------------------------------------

    async fn on_finish(&mut self, reply: oneshot::Sender<UploadResult<Option<CompletedUpload>>>) {
        if let Some(err) = self.failure.take() {
            let _ = reply.send(Err(err));
            return;
        }

        self.session.state = SessionState::Draining;
        debug!(buffered = self.accumulator.len(), "draining session");

        // End-of-input overrides a pause: held dispatches drain with the
        // rest. Any still-held acknowledgement belongs to a write the
        // producer cancelled before finishing; releasing it is a no-op.
        if self.session.pause != PauseState::Active {
            self.session.pause = PauseState::Active;
            self.refill();
        }
        for ack in self.held_writes.drain(..) {
            let _ = ack.send(Ok(()));
        }

        // Flush remaining full-size parts, then the final partial part.
        // Zero remaining bytes is a legal no-op, not a zero-length part.
        self.pump().await;
        if self.failure.is_none() && !self.accumulator.is_empty() {
            if let Some(body) = self.accumulator.extract_part(self.config.part_size(), true) {
                if !body.is_empty() {
                    self.dispatch(body).await;
                }
            }
        }

        // Wait for the queue and every in-flight upload to settle.
        while self.failure.is_none() && !self.in_flight.is_empty() {
            if let Some(joined) = self.in_flight.join_next().await {
                self.on_settled(joined).await;
            }
        }

        if let Some(err) = self.failure.take() {
            let _ = reply.send(Err(err));
            return;
        }

        // A producer that wrote zero bytes never created anything in the
        // store; the session finishes without initiate or complete.
        if !self.session.has_started() && self.session.parts_recorded() == 0 {
            self.session.state = SessionState::Completed;
            debug!("empty input, finished without store calls");
            let _ = reply.send(Ok(None));
            return;
        }

        self.session.state = SessionState::Completing;
        let session_id = self.session.session_id.clone().unwrap_or_default();
        let parts = self.session.ordered_parts();
        debug!(session_id = %session_id, parts = parts.len(), "completing session");

        match self
            .store
            .complete_upload(&self.session.destination, &session_id, &parts)
            .await
        {
            Ok(result) => {
                self.session.state = SessionState::Completed;
                self.emit(UploadEvent::Uploaded {
                    result: result.clone(),
                });
                let _ = reply.send(Ok(Some(result)));
            }
            Err(source) => {
                let err = UploadError::Completion { session_id, source };
                let err = self.abort_session(err).await;
                let _ = reply.send(Err(err));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    /// Tear the session down after `original`.
    ///
    /// Stragglers settle first: there is no mid-flight cancellation of an
    /// individual upload, and abort does not retract parts the store has
    /// already acknowledged. The abort call runs exactly once; if it fails
    /// too, both errors are reported together.
    async fn abort_session(&mut self, original: UploadError) -> UploadError {
        self.session.state = SessionState::Aborting;
        self.queued.clear();

        while self.in_flight.join_next().await.is_some() {
            self.gate.release();
        }

        let final_err = match self.session.session_id.clone() {
            Some(id) => {
                debug!(session_id = %id, "aborting session");
                match self
                    .store
                    .abort_upload(&self.session.destination, &id)
                    .await
                {
                    Ok(()) => original,
                    Err(source) => UploadError::Abort {
                        original: Box::new(original),
                        source,
                    },
                }
            }
            None => original,
        };

        self.session.state = SessionState::Failed;
        warn!(error = %final_err, "session failed");
        self.emit(UploadEvent::Error {
            message: final_err.to_string(),
        });
        final_err
    }

    /// Fail every held write after the session died under them.
    fn fail_waiters(&mut self, err: &UploadError) {
        self.queued.clear();
        for ack in self.held_writes.drain(..) {
            let _ = ack.send(Err(err.already_failed()));
        }
    }

    /// The handle was dropped without `finish`: best-effort cleanup.
    async fn on_disconnect(&mut self) {
        if self.session.state.is_terminal() {
            return;
        }

        while self.in_flight.join_next().await.is_some() {
            self.gate.release();
        }
        self.queued.clear();

        if let Some(id) = self.session.session_id.clone() {
            warn!(session_id = %id, "handle dropped before finish, aborting session");
            if let Err(e) = self.store.abort_upload(&self.session.destination, &id).await {
                warn!(error = %e, "best-effort abort failed");
            }
        }
        self.session.state = SessionState::Failed;
    }
}
