//! Push-to-talk voice capture.
//!
//! ```text
//!   Idle → Recording → Processing → Idle
//!    └───→ Error ───→ (start again)
//! ```
//!
//! [`start`](VoiceCaptureController::start) takes the microphone lease,
//! negotiates an encoding and opens the device. [`stop`](VoiceCaptureController::stop)
//! finalizes the recording, releases the device and lease, and sends the
//! payload to the [`Transcriber`]. [`cancel`](VoiceCaptureController::cancel)
//! discards everything; a transcription that completes afterwards is ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio_io::{AudioEncoding, AudioPayload, CaptureDevice, CaptureStream, negotiate_encoding};
use crate::backend::Transcriber;
use crate::error::VoiceError;
use crate::resource::{AudioResourceManager, ResourceKind, ResourceLease};

/// Coarse capture status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Idle,
    Recording,
    /// Recording finished; waiting for the transcript.
    Processing,
    /// The device could not be opened.
    Error,
}

/// Observable capture state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureState {
    pub status: CaptureStatus,
    pub elapsed_seconds: u64,
    /// Message of the most recent failure, if any.
    pub error: Option<String>,
}

impl CaptureState {
    const fn idle() -> Self {
        Self {
            status: CaptureStatus::Idle,
            elapsed_seconds: 0,
            error: None,
        }
    }

    /// Whether a recording is open or being transcribed.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(
            self.status,
            CaptureStatus::Recording | CaptureStatus::Processing
        )
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Events emitted by the capture controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    StateChanged(CaptureState),
    /// Seconds since recording started.
    Elapsed(u64),
    Transcript(String),
    Error(String),
}

struct Recording {
    stream: Box<dyn CaptureStream>,
    encoding: AudioEncoding,
    lease: ResourceLease,
    ticker: JoinHandle<()>,
}

impl Recording {
    fn discard(mut self) {
        self.ticker.abort();
        self.stream.abort();
        self.lease.release();
    }
}

struct Inner {
    state: CaptureState,
    recording: Option<Recording>,
    generation: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    device: Arc<dyn CaptureDevice>,
    transcriber: Arc<dyn Transcriber>,
    resources: AudioResourceManager,
    event_tx: mpsc::UnboundedSender<CaptureEvent>,
}

/// Records one utterance at a time and turns it into text.
///
/// Dropping the controller cancels any recording in progress.
pub struct VoiceCaptureController {
    shared: Arc<Shared>,
}

impl VoiceCaptureController {
    /// Create a controller.
    ///
    /// Returns the controller and a receiver for [`CaptureEvent`]s.
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        transcriber: Arc<dyn Transcriber>,
        resources: AudioResourceManager,
    ) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: CaptureState::idle(),
                recording: None,
                generation: 0,
            }),
            device,
            transcriber,
            resources,
            event_tx,
        });
        (Self { shared }, event_rx)
    }

    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.shared.lock().state.clone()
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.shared.lock().state.status == CaptureStatus::Recording
    }

    /// Open the microphone and start recording.
    ///
    /// Rejected with [`VoiceError::AlreadyActive`] while recording or
    /// processing. On a device failure the error is emitted and returned, the
    /// status becomes `Error` and nothing is retained.
    pub fn start(&self) -> Result<(), VoiceError> {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if inner.state.is_busy() {
            return Err(VoiceError::AlreadyActive);
        }

        inner.generation += 1;
        let generation = inner.generation;

        let lease = shared.resources.acquire(ResourceKind::Microphone);
        let opened = negotiate_encoding(&shared.device.supported_encodings())
            .and_then(|encoding| Ok((encoding, shared.device.open(encoding)?)));

        let (encoding, stream) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                drop(lease);
                tracing::warn!(error = %e, "Failed to open microphone");
                shared.set_state(
                    &mut inner,
                    CaptureState {
                        status: CaptureStatus::Error,
                        elapsed_seconds: 0,
                        error: Some(e.to_string()),
                    },
                );
                shared.emit(CaptureEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let ticker = tokio::spawn(run_ticker(
            Arc::clone(shared),
            generation,
            lease.revocation(),
        ));

        inner.recording = Some(Recording {
            stream,
            encoding,
            lease,
            ticker,
        });
        shared.set_state(
            &mut inner,
            CaptureState {
                status: CaptureStatus::Recording,
                elapsed_seconds: 0,
                error: None,
            },
        );

        tracing::info!(%encoding, "Recording started");
        Ok(())
    }

    /// Finish the recording and transcribe it.
    ///
    /// Returns the transcript. On failure the error is emitted and returned
    /// and the status goes back to `Idle`. Returns [`VoiceError::Cancelled`]
    /// when [`cancel`](Self::cancel) ran while the transcript was pending.
    pub async fn stop(&self) -> Result<String, VoiceError> {
        let shared = &self.shared;
        let (recording, generation, elapsed) = {
            let mut inner = shared.lock();
            let Some(recording) = inner.recording.take() else {
                return Err(VoiceError::NotActive);
            };
            let elapsed = inner.state.elapsed_seconds;
            shared.set_state(
                &mut inner,
                CaptureState {
                    status: CaptureStatus::Processing,
                    elapsed_seconds: elapsed,
                    error: None,
                },
            );
            (recording, inner.generation, elapsed)
        };

        let Recording {
            stream,
            encoding,
            mut lease,
            ticker,
        } = recording;
        ticker.abort();
        let finished = stream.finish();
        lease.release();

        tracing::debug!(elapsed_seconds = elapsed, "Recording stopped");

        let result = match finished {
            Ok(segments) => {
                let payload = AudioPayload::from_segments(segments, encoding);
                if payload.is_empty() {
                    Err(VoiceError::EmptyRecording)
                } else {
                    shared.transcriber.transcribe(payload).await
                }
            }
            Err(e) => Err(e),
        };

        let mut inner = shared.lock();
        if inner.generation != generation {
            tracing::debug!("Discarding transcription for a cancelled recording");
            return Err(VoiceError::Cancelled);
        }

        match result {
            Ok(text) => {
                shared.set_state(&mut inner, CaptureState::idle());
                shared.emit(CaptureEvent::Transcript(text.clone()));
                tracing::info!(chars = text.chars().count(), "Transcript ready");
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transcription failed");
                shared.set_state(
                    &mut inner,
                    CaptureState {
                        error: Some(e.to_string()),
                        ..CaptureState::idle()
                    },
                );
                shared.emit(CaptureEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Force-stop any recording and discard its audio.
    ///
    /// A transcription already in flight is invalidated.
    pub fn cancel(&self) {
        self.shared.cancel_generation(None);
    }
}

impl Drop for VoiceCaptureController {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, inner: &mut Inner, new_state: CaptureState) {
        if inner.state != new_state {
            tracing::debug!(
                old = ?inner.state.status,
                new = ?new_state.status,
                "Capture state transition"
            );
            inner.state = new_state.clone();
            self.emit(CaptureEvent::StateChanged(new_state));
        }
    }

    fn emit(&self, event: CaptureEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Capture event receiver dropped");
        }
    }

    /// Cancel everything. With `Some(generation)`, only if that generation is current.
    fn cancel_generation(&self, only: Option<u64>) {
        let recording = {
            let mut inner = self.lock();
            if only.is_some_and(|g| g != inner.generation) {
                return;
            }
            inner.generation += 1;
            let recording = inner.recording.take();
            if inner.state.status != CaptureStatus::Idle || inner.state.error.is_some() {
                self.set_state(&mut inner, CaptureState::idle());
            }
            recording
        };

        if let Some(recording) = recording {
            tracing::info!("Recording discarded");
            recording.discard();
        }
    }

    fn tick(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation || inner.state.status != CaptureStatus::Recording {
            return;
        }
        inner.state.elapsed_seconds += 1;
        let elapsed = inner.state.elapsed_seconds;
        drop(inner);
        self.emit(CaptureEvent::Elapsed(elapsed));
    }
}

/// 1 Hz elapsed counter; also watches for the microphone being taken over.
async fn run_ticker(shared: Arc<Shared>, generation: u64, revoked: CancellationToken) {
    let period = Duration::from_secs(1);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            () = revoked.cancelled() => {
                tracing::debug!("Microphone lease revoked");
                // Runs on this task; detach before discarding.
                let recording = {
                    let mut inner = shared.lock();
                    if inner.generation != generation {
                        return;
                    }
                    inner.recording.take()
                };
                if let Some(recording) = recording {
                    let Recording { stream, mut lease, .. } = recording;
                    stream.abort();
                    lease.release();
                }
                shared.cancel_generation(Some(generation));
                return;
            }
            _ = interval.tick() => shared.tick(generation),
        }
    }
}
