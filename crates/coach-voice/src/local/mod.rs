//! Local (cpal/rodio) implementations of [`CaptureDevice`] and [`AudioOutput`].
//!
//! Both adapters share one [`AudioThreadHandle`]: the audio OS thread owns
//! the capture stream and the playback sink. Every handle method takes
//! `&self`, so an `Arc` without a `Mutex` is enough.

mod audio_thread;
mod mic;
mod speaker;

use std::sync::Arc;

use bytes::Bytes;

pub use audio_thread::AudioThreadHandle;

use crate::audio_io::{AudioEncoding, AudioOutput, CaptureDevice, CaptureStream, PlaybackHandle};
use crate::backend::SynthesizedAudio;
use crate::error::VoiceError;

/// Local microphone. Records WAV.
pub struct LocalCaptureDevice {
    handle: Arc<AudioThreadHandle>,
}

impl CaptureDevice for LocalCaptureDevice {
    fn supported_encodings(&self) -> Vec<AudioEncoding> {
        vec![AudioEncoding::Wav]
    }

    fn open(&self, encoding: AudioEncoding) -> Result<Box<dyn CaptureStream>, VoiceError> {
        if encoding != AudioEncoding::Wav {
            return Err(VoiceError::UnsupportedEncoding(encoding.to_string()));
        }
        self.handle.start_capture()?;
        Ok(Box::new(LocalCaptureStream {
            handle: Arc::clone(&self.handle),
        }))
    }
}

struct LocalCaptureStream {
    handle: Arc<AudioThreadHandle>,
}

impl CaptureStream for LocalCaptureStream {
    fn finish(self: Box<Self>) -> Result<Vec<Bytes>, VoiceError> {
        let wav = self.handle.finish_capture()?;
        if wav.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Bytes::from(wav)])
    }

    fn abort(self: Box<Self>) {
        self.handle.abort_capture();
    }
}

/// Local speaker.
pub struct LocalAudioOutput {
    handle: Arc<AudioThreadHandle>,
}

impl AudioOutput for LocalAudioOutput {
    fn play(&self, audio: SynthesizedAudio) -> Result<PlaybackHandle, VoiceError> {
        let (completion, handle) = PlaybackHandle::channel();
        self.handle.play(audio.bytes, completion)?;
        Ok(handle)
    }

    fn stop(&self) {
        self.handle.stop_playback();
    }
}

/// Spawn one audio thread and return the device pair that shares it.
pub fn open_local_audio() -> Result<(LocalCaptureDevice, LocalAudioOutput), VoiceError> {
    let handle = Arc::new(AudioThreadHandle::spawn()?);
    let device = LocalCaptureDevice {
        handle: Arc::clone(&handle),
    };
    let output = LocalAudioOutput { handle };
    Ok((device, output))
}
