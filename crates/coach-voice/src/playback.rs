//! Sequential speech playback for one message at a time.
//!
//! The controller is a state machine driven by a background task:
//!
//! ```text
//!   Idle → Loading(0) → Playing(0) → Loading(1) → … → Idle
//!    ▲                                   │      │
//!    └────────────── stop() ─────────────┘      └→ Error
//! ```
//!
//! Only one chunk is synthesized or played at a time, in ascending order. The
//! speaker lease and the playing audio handle are released on every exit path:
//! natural completion, [`stop`](SpeechPlaybackController::stop), a failed
//! chunk, revocation of the lease, and drop of the controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio_io::AudioOutput;
use crate::backend::Synthesizer;
use crate::chunker;
use crate::error::VoiceError;
use crate::resource::{AudioResourceManager, ResourceKind, ResourceLease};

// ── State ──────────────────────────────────────────────────────────

/// Coarse playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    /// Synthesizing the current chunk.
    Loading,
    /// The current chunk is audible.
    Playing,
    /// The last reading failed. Cleared by `stop()` or the next `start()`.
    Error,
}

/// Observable playback state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub active_message_id: Option<String>,
    pub chunk_index: usize,
    pub status: PlaybackStatus,
    pub error: Option<String>,
}

impl PlaybackState {
    const fn idle() -> Self {
        Self {
            active_message_id: None,
            chunk_index: 0,
            status: PlaybackStatus::Idle,
            error: None,
        }
    }

    /// Whether a reading is loading or playing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, PlaybackStatus::Loading | PlaybackStatus::Playing)
    }

    /// Whether `message_id` is the one being read.
    #[must_use]
    pub fn is_reading(&self, message_id: &str) -> bool {
        self.is_active() && self.active_message_id.as_deref() == Some(message_id)
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::idle()
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the playback controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// State changed.
    StateChanged(PlaybackState),

    /// A reading began.
    ReadingStarted { message_id: String, chunks: usize },

    /// Every chunk played to the end.
    ReadingFinished { message_id: String },

    /// The reading was stopped before the end.
    ReadingStopped { message_id: String },

    /// A chunk failed; the reading is over.
    Error { message_id: String, message: String },
}

// ── Controller ─────────────────────────────────────────────────────

struct Reading {
    generation: u64,
    message_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    lease: ResourceLease,
}

struct Inner {
    state: PlaybackState,
    reading: Option<Reading>,
    generation: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    synthesizer: Arc<dyn Synthesizer>,
    output: Arc<dyn AudioOutput>,
    resources: AudioResourceManager,
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
}

/// Reads one message's chunk list aloud, chunk by chunk.
///
/// Emits [`PlaybackEvent`]s via a channel. Dropping the controller stops any
/// reading in progress.
pub struct SpeechPlaybackController {
    shared: Arc<Shared>,
}

impl SpeechPlaybackController {
    /// Create a controller.
    ///
    /// Returns the controller and a receiver for [`PlaybackEvent`]s.
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        output: Arc<dyn AudioOutput>,
        resources: AudioResourceManager,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: PlaybackState::idle(),
                reading: None,
                generation: 0,
            }),
            synthesizer,
            output,
            resources,
            event_tx,
        });
        (Self { shared }, event_rx)
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state.clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.lock().state.is_active()
    }

    /// Start reading `chunks` for `message_id`.
    ///
    /// Rejected with [`VoiceError::AlreadyActive`] while another reading is
    /// loading or playing; call [`stop`](Self::stop) first. An empty chunk
    /// list finishes immediately.
    pub fn start(&self, message_id: &str, chunks: Vec<String>) -> Result<(), VoiceError> {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.state.is_active() {
            return Err(VoiceError::AlreadyActive);
        }

        let lease = shared.resources.acquire(ResourceKind::Speaker);
        inner.generation += 1;
        let generation = inner.generation;

        tracing::info!(
            message_id,
            chunks = chunks.len(),
            "Reading started"
        );
        shared.emit(PlaybackEvent::ReadingStarted {
            message_id: message_id.to_string(),
            chunks: chunks.len(),
        });

        if chunks.is_empty() {
            drop(lease);
            shared.set_state(&mut inner, PlaybackState::idle());
            shared.emit(PlaybackEvent::ReadingFinished {
                message_id: message_id.to_string(),
            });
            return Ok(());
        }

        shared.set_state(
            &mut inner,
            PlaybackState {
                active_message_id: Some(message_id.to_string()),
                chunk_index: 0,
                status: PlaybackStatus::Loading,
                error: None,
            },
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_reading(
            Arc::clone(shared),
            generation,
            chunks,
            cancel.clone(),
            lease.revocation(),
        ));

        inner.reading = Some(Reading {
            generation,
            message_id: message_id.to_string(),
            cancel,
            task: Some(task),
            lease,
        });

        Ok(())
    }

    /// Chunk `text` with [`chunker::chunk`] and start reading it.
    pub fn start_text(
        &self,
        message_id: &str,
        text: &str,
        chunk_size: usize,
    ) -> Result<(), VoiceError> {
        self.start(message_id, chunker::chunk(text, chunk_size))
    }

    /// Stop the current reading immediately.
    ///
    /// Emits `ReadingStopped` once per reading; later calls are no-ops. Also
    /// clears a previous `Error` back to `Idle`.
    pub fn stop(&self) {
        let shared = &self.shared;
        let reading = {
            let mut inner = shared.lock();
            let reading = inner.reading.take();
            if reading.is_some() || inner.state.status == PlaybackStatus::Error {
                shared.set_state(&mut inner, PlaybackState::idle());
            }
            reading
        };

        if let Some(reading) = reading {
            shared.teardown(reading);
        }
    }
}

impl Drop for SpeechPlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Transition to a new state and emit a state-change event.
    fn set_state(&self, inner: &mut Inner, new_state: PlaybackState) {
        if inner.state != new_state {
            tracing::debug!(
                old = ?inner.state.status,
                new = ?new_state.status,
                chunk = new_state.chunk_index,
                "Playback state transition"
            );
            inner.state = new_state.clone();
            self.emit(PlaybackEvent::StateChanged(new_state));
        }
    }

    /// Emit an event (best-effort; a dropped receiver is logged and ignored).
    fn emit(&self, event: PlaybackEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Playback event receiver dropped");
        }
    }

    /// Halt audio and release everything a reading holds.
    fn teardown(&self, mut reading: Reading) {
        reading.cancel.cancel();
        self.output.stop();
        if let Some(task) = reading.task.take() {
            task.abort();
        }
        reading.lease.release();
        tracing::info!(message_id = %reading.message_id, "Reading stopped");
        self.emit(PlaybackEvent::ReadingStopped {
            message_id: reading.message_id,
        });
    }

    /// Move to `status` at `index` if `generation` is still current.
    fn advance(&self, generation: u64, status: PlaybackStatus, index: usize) -> bool {
        let mut inner = self.lock();
        let Some(message_id) = current_message(&inner, generation) else {
            return false;
        };
        self.set_state(
            &mut inner,
            PlaybackState {
                active_message_id: Some(message_id),
                chunk_index: index,
                status,
                error: None,
            },
        );
        true
    }

    fn take_current(&self, inner: &mut Inner, generation: u64) -> Option<Reading> {
        if inner
            .reading
            .as_ref()
            .is_some_and(|r| r.generation == generation)
        {
            inner.reading.take()
        } else {
            None
        }
    }

    fn finish(&self, generation: u64) {
        let reading = {
            let mut inner = self.lock();
            let reading = self.take_current(&mut inner, generation);
            if reading.is_some() {
                self.set_state(&mut inner, PlaybackState::idle());
            }
            reading
        };

        if let Some(mut reading) = reading {
            reading.lease.release();
            tracing::info!(message_id = %reading.message_id, "Reading finished");
            self.emit(PlaybackEvent::ReadingFinished {
                message_id: reading.message_id,
            });
        }
    }

    fn fail(&self, generation: u64, index: usize, error: &VoiceError) {
        let reading = {
            let mut inner = self.lock();
            let reading = self.take_current(&mut inner, generation);
            if let Some(r) = &reading {
                self.set_state(
                    &mut inner,
                    PlaybackState {
                        active_message_id: Some(r.message_id.clone()),
                        chunk_index: index,
                        status: PlaybackStatus::Error,
                        error: Some(error.to_string()),
                    },
                );
            }
            reading
        };

        if let Some(mut reading) = reading {
            self.output.stop();
            reading.lease.release();
            tracing::warn!(
                message_id = %reading.message_id,
                chunk = index,
                %error,
                "Reading failed"
            );
            self.emit(PlaybackEvent::Error {
                message_id: reading.message_id,
                message: error.to_string(),
            });
        }
    }

    /// Another owner took the speaker; behave as if stopped.
    fn revoked(&self, generation: u64) {
        let reading = {
            let mut inner = self.lock();
            let reading = self.take_current(&mut inner, generation);
            if reading.is_some() {
                self.set_state(&mut inner, PlaybackState::idle());
            }
            reading
        };

        if let Some(mut reading) = reading {
            // The task is the caller; it returns right after this.
            reading.task.take();
            tracing::debug!(message_id = %reading.message_id, "Speaker lease revoked");
            self.teardown(reading);
        }
    }
}

fn current_message(inner: &Inner, generation: u64) -> Option<String> {
    inner
        .reading
        .as_ref()
        .filter(|r| r.generation == generation)
        .map(|r| r.message_id.clone())
}

/// Body of the reading task: synthesize, play, advance.
async fn run_reading(
    shared: Arc<Shared>,
    generation: u64,
    chunks: Vec<String>,
    cancel: CancellationToken,
    revoked: CancellationToken,
) {
    for (index, text) in chunks.iter().enumerate() {
        if !shared.advance(generation, PlaybackStatus::Loading, index) {
            return;
        }

        let synthesized = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = revoked.cancelled() => {
                shared.revoked(generation);
                return;
            }
            result = shared.synthesizer.synthesize(text) => result,
        };

        let audio = match synthesized {
            Ok(audio) => audio,
            Err(e) => {
                shared.fail(generation, index, &e);
                return;
            }
        };

        if !shared.advance(generation, PlaybackStatus::Playing, index) {
            return;
        }

        let handle = match shared.output.play(audio) {
            Ok(handle) => handle,
            Err(e) => {
                shared.fail(generation, index, &e);
                return;
            }
        };

        let ended = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = revoked.cancelled() => {
                shared.revoked(generation);
                return;
            }
            result = handle.finished() => result,
        };

        match ended {
            Ok(()) => {
                tracing::debug!(chunk = index, total = chunks.len(), "Chunk played");
            }
            Err(VoiceError::Cancelled) => {
                // Output halted from elsewhere.
                shared.revoked(generation);
                return;
            }
            Err(e) => {
                shared.fail(generation, index, &e);
                return;
            }
        }
    }

    shared.finish(generation);
}
