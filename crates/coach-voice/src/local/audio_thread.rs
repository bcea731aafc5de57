//! Dedicated audio I/O thread.
//!
//! `cpal::Stream` and `rodio::OutputStream` are `!Send` on some platforms.
//! Both are confined to one OS thread; [`AudioThreadHandle`] is the
//! `Send + Sync` proxy that routes every call through an [`AudioCommand`].

use std::sync::mpsc;
use std::thread;

use bytes::Bytes;

use super::mic::MicCapture;
use super::speaker::Speaker;
use crate::audio_io::PlaybackCompletion;
use crate::error::VoiceError;

// ── Commands ───────────────────────────────────────────────────────

enum AudioCommand {
    /// Begin recording from the microphone.
    StartCapture {
        reply: mpsc::Sender<Result<(), VoiceError>>,
    },

    /// Stop recording and return a WAV file.
    FinishCapture {
        reply: mpsc::Sender<Result<Vec<u8>, VoiceError>>,
    },

    /// Stop recording and discard the audio (fire-and-forget).
    AbortCapture,

    /// Play one encoded clip.
    Play {
        bytes: Bytes,
        completion: PlaybackCompletion,
        reply: mpsc::Sender<Result<(), VoiceError>>,
    },

    /// Stop any active playback immediately (fire-and-forget).
    StopPlayback,

    /// Shut down the audio thread, releasing all resources.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the dedicated audio I/O thread.
///
/// Request–reply methods block the caller until the audio thread responds.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread and open the output device.
    ///
    /// The microphone is opened lazily, per recording.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();

        let thread = thread::Builder::new()
            .name("coach-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| {
                VoiceError::OutputStreamError(format!("failed to spawn audio thread: {e}"))
            })?;

        init_rx.recv().map_err(|_| VoiceError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    pub fn start_capture(&self) -> Result<(), VoiceError> {
        self.send_and_recv(|reply| AudioCommand::StartCapture { reply })
    }

    pub fn finish_capture(&self) -> Result<Vec<u8>, VoiceError> {
        self.send_and_recv(|reply| AudioCommand::FinishCapture { reply })
    }

    pub fn abort_capture(&self) {
        let _ = self.cmd_tx.send(AudioCommand::AbortCapture);
    }

    pub fn play(&self, bytes: Bytes, completion: PlaybackCompletion) -> Result<(), VoiceError> {
        self.send_and_recv(|reply| AudioCommand::Play {
            bytes,
            completion,
            reply,
        })
    }

    pub fn stop_playback(&self) {
        let _ = self.cmd_tx.send(AudioCommand::StopPlayback);
    }

    /// Send a command and block until the audio thread replies.
    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<Result<T, VoiceError>>) -> AudioCommand,
    ) -> Result<T, VoiceError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| VoiceError::AudioThreadDied)?;
        rx.recv().map_err(|_| VoiceError::AudioThreadDied)?
    }

    // ── Audio thread event loop ────────────────────────────────────

    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), VoiceError>>) {
        let mut speaker = match Speaker::new() {
            Ok(s) => s,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };
        let mut mic = MicCapture::new();

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::StartCapture { reply } => {
                    let _ = reply.send(mic.start());
                }

                AudioCommand::FinishCapture { reply } => {
                    let _ = reply.send(mic.finish());
                }

                AudioCommand::AbortCapture => mic.abort(),

                AudioCommand::Play {
                    bytes,
                    completion,
                    reply,
                } => {
                    let _ = reply.send(speaker.play(bytes, completion));
                }

                AudioCommand::StopPlayback => speaker.stop(),

                AudioCommand::Shutdown => break,
            }
        }

        // Devices are dropped here, on the audio thread.
        mic.abort();
        speaker.stop();
        tracing::debug!("Audio thread shutting down");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        // Best-effort shutdown; the thread may already be dead.
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
