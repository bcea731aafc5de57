//! Speaker output via `rodio`.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::audio_io::PlaybackCompletion;
use crate::error::VoiceError;

/// Plays decoded clips on the default output device.
///
/// Not `Send`: lives on the audio thread.
pub(crate) struct Speaker {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Current clip and its "stopped" flag.
    current: Option<(Arc<Sink>, Arc<AtomicBool>)>,
}

impl Speaker {
    /// Open the default output device.
    pub(crate) fn new() -> Result<Self, VoiceError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            current: None,
        })
    }

    /// Play one encoded clip, replacing anything already playing.
    ///
    /// `completion` fires when the clip drains naturally. If the clip is
    /// stopped first, it is dropped instead, which the handle reads as
    /// cancelled.
    pub(crate) fn play(
        &mut self,
        bytes: Bytes,
        completion: PlaybackCompletion,
    ) -> Result<(), VoiceError> {
        self.stop();

        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|e| VoiceError::PlaybackError(format!("undecodable audio: {e}")))?;
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?;
        sink.append(source);

        let sink = Arc::new(sink);
        let stopped = Arc::new(AtomicBool::new(false));
        self.current = Some((Arc::clone(&sink), Arc::clone(&stopped)));

        // `sleep_until_end()` returns early once `stop()` clears the queue.
        std::thread::spawn(move || {
            sink.sleep_until_end();
            if stopped.load(Ordering::SeqCst) {
                return;
            }
            tracing::trace!("Clip finished naturally");
            completion.complete(Ok(()));
        });

        tracing::debug!("Audio playback started");
        Ok(())
    }

    /// Stop the current clip immediately.
    pub(crate) fn stop(&mut self) {
        if let Some((sink, stopped)) = self.current.take() {
            stopped.store(true, Ordering::SeqCst);
            sink.stop();
            tracing::debug!("Audio playback stopped");
        }
    }
}
