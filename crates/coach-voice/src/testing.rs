//! In-memory test doubles for the speech and device ports.
//!
//! Enabled for this crate's tests and, through the `test-utils` feature, for
//! downstream crates. Timing uses `tokio::time`, so tests can run with paused
//! time.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::audio_io::{
    AudioEncoding, AudioOutput, AudioPayload, CaptureDevice, CaptureStream, PlaybackCompletion,
    PlaybackHandle,
};
use crate::backend::{SynthesizedAudio, Synthesizer, Transcriber};
use crate::error::VoiceError;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Synthesizer ────────────────────────────────────────────────────

/// Synthesizer that echoes the text back as the audio bytes.
#[derive(Default)]
pub struct ScriptedSynthesizer {
    calls: Mutex<Vec<String>>,
    fail_at: Option<usize>,
    delay: Duration,
}

impl ScriptedSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `index`-th call (0-based).
    #[must_use]
    pub const fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Take `delay` per call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Texts synthesized so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, VoiceError> {
        let index = {
            let mut calls = lock(&self.calls);
            calls.push(text.to_string());
            calls.len() - 1
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_at == Some(index) {
            return Err(VoiceError::SynthesisError(format!("scripted failure at {index}")));
        }

        Ok(SynthesizedAudio {
            bytes: Bytes::from(text.to_string()),
            content_type: "audio/mpeg".to_string(),
        })
    }
}

// ── Output ─────────────────────────────────────────────────────────

/// Output whose clips "play" for a fixed duration of tokio time.
pub struct ScriptedOutput {
    clip_length: Duration,
    played: Mutex<Vec<Bytes>>,
    pending: Arc<Mutex<Option<(u64, PlaybackCompletion)>>>,
    next_clip: AtomicU64,
    stops: AtomicUsize,
}

impl ScriptedOutput {
    pub fn new(clip_length: Duration) -> Self {
        Self {
            clip_length,
            played: Mutex::new(Vec::new()),
            pending: Arc::new(Mutex::new(None)),
            next_clip: AtomicU64::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// Clips started so far, decoded back to text.
    pub fn played(&self) -> Vec<String> {
        lock(&self.played)
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    /// Whether a clip is currently audible.
    pub fn is_playing(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Number of `stop()` calls.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AudioOutput for ScriptedOutput {
    fn play(&self, audio: SynthesizedAudio) -> Result<PlaybackHandle, VoiceError> {
        lock(&self.played).push(audio.bytes);

        let clip = self.next_clip.fetch_add(1, Ordering::SeqCst);
        let (completion, handle) = PlaybackHandle::channel();
        *lock(&self.pending) = Some((clip, completion));

        let pending = Arc::clone(&self.pending);
        let clip_length = self.clip_length;
        tokio::spawn(async move {
            tokio::time::sleep(clip_length).await;
            let mut slot = lock(&pending);
            if slot.as_ref().is_some_and(|(id, _)| *id == clip) {
                if let Some((_, completion)) = slot.take() {
                    completion.complete(Ok(()));
                }
            }
        });

        Ok(handle)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        lock(&self.pending).take();
    }
}

// ── Capture ────────────────────────────────────────────────────────

/// Microphone that yields fixed segments.
pub struct FakeMicrophone {
    encodings: Vec<AudioEncoding>,
    segments: Vec<Bytes>,
    next_error: Mutex<Option<VoiceError>>,
    opened: AtomicUsize,
    open_streams: Arc<AtomicUsize>,
}

impl FakeMicrophone {
    pub fn new(encodings: Vec<AudioEncoding>, segments: Vec<Bytes>) -> Self {
        Self {
            encodings,
            segments,
            next_error: Mutex::new(None),
            opened: AtomicUsize::new(0),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the next `open()` fail with `error`.
    pub fn fail_next_open(&self, error: VoiceError) {
        *lock(&self.next_error) = Some(error);
    }

    /// Total successful opens.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Whether a recording is currently holding the device.
    pub fn is_open(&self) -> bool {
        self.open_streams.load(Ordering::SeqCst) > 0
    }
}

impl CaptureDevice for FakeMicrophone {
    fn supported_encodings(&self) -> Vec<AudioEncoding> {
        self.encodings.clone()
    }

    fn open(&self, encoding: AudioEncoding) -> Result<Box<dyn CaptureStream>, VoiceError> {
        if let Some(error) = lock(&self.next_error).take() {
            return Err(error);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            encoding,
            segments: self.segments.clone(),
            open_streams: Arc::clone(&self.open_streams),
        }))
    }
}

struct FakeStream {
    #[allow(dead_code)]
    encoding: AudioEncoding,
    segments: Vec<Bytes>,
    open_streams: Arc<AtomicUsize>,
}

impl CaptureStream for FakeStream {
    fn finish(self: Box<Self>) -> Result<Vec<Bytes>, VoiceError> {
        Ok(self.segments.clone())
    }

    fn abort(self: Box<Self>) {}
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Transcriber ────────────────────────────────────────────────────

/// Transcriber with a fixed reply.
pub struct ScriptedTranscriber {
    reply: Mutex<Result<String, VoiceError>>,
    delay: Duration,
    received: Mutex<Vec<AudioPayload>>,
}

impl ScriptedTranscriber {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Mutex::new(Ok(text.to_string())),
            delay: Duration::ZERO,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: VoiceError) -> Self {
        Self {
            reply: Mutex::new(Err(error)),
            delay: Duration::ZERO,
            received: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_reply(&self, reply: Result<String, VoiceError>) {
        *lock(&self.reply) = reply;
    }

    /// Payloads received so far.
    pub fn received(&self) -> Vec<AudioPayload> {
        lock(&self.received).clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, payload: AudioPayload) -> Result<String, VoiceError> {
        lock(&self.received).push(payload);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        lock(&self.reply).clone()
    }
}
