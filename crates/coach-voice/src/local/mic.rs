//! Microphone capture via `cpal`, encoded to WAV with `hound`.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use crate::error::VoiceError;

/// Records mono PCM from the default input device.
///
/// Not `Send`: lives on the audio thread.
pub(crate) struct MicCapture {
    stream: Option<Stream>,
    buffer: Arc<Mutex<Vec<f32>>>,
    is_recording: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
}

impl MicCapture {
    pub(crate) fn new() -> Self {
        Self {
            stream: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
            is_recording: Arc::new(AtomicBool::new(false)),
            sample_rate: 0,
            channels: 1,
        }
    }

    /// Open the default input device and start buffering samples.
    pub(crate) fn start(&mut self) -> Result<(), VoiceError> {
        if self.is_recording.load(Ordering::SeqCst) {
            return Err(VoiceError::AlreadyActive);
        }

        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(VoiceError::NoInputDevice)?;

        let config = device
            .default_input_config()
            .map_err(|e| classify(&e.to_string()))?;

        self.sample_rate = config.sample_rate().0;
        self.channels = config.channels();

        let stream = self.build_input_stream(&device, &config)?;
        stream.play().map_err(|e| classify(&e.to_string()))?;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = self.sample_rate,
            channels = self.channels,
            "Microphone opened"
        );

        self.stream = Some(stream);
        self.is_recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop recording and return the audio as a 16-bit mono WAV file.
    pub(crate) fn finish(&mut self) -> Result<Vec<u8>, VoiceError> {
        let raw = self.halt();
        let mono = to_mono(&raw, self.channels);
        encode_wav(&mono, self.sample_rate)
    }

    /// Stop recording and drop the samples.
    pub(crate) fn abort(&mut self) {
        let _ = self.halt();
    }

    fn halt(&mut self) -> Vec<f32> {
        self.is_recording.store(false, Ordering::SeqCst);
        // Dropping the stream closes the device.
        self.stream = None;
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn build_input_stream(
        &self,
        device: &Device,
        config: &cpal::SupportedStreamConfig,
    ) -> Result<Stream, VoiceError> {
        let stream_config: StreamConfig = config.clone().into();
        let sample_format = config.sample_format();

        let err_fn = |err: cpal::StreamError| {
            tracing::error!(%err, "Audio input stream error");
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                let sink = self.sample_sink();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| sink(data),
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let sink = self.sample_sink();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                        sink(&float_data);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I32 => {
                let sink = self.sample_sink();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i32], _: &cpal::InputCallbackInfo| {
                        #[allow(clippy::cast_precision_loss)]
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 2_147_483_648.0).collect();
                        sink(&float_data);
                    },
                    err_fn,
                    None,
                )
            }
            _ => {
                return Err(VoiceError::InputStreamError(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream.map_err(|e| classify(&e.to_string()))
    }

    /// Closure appending samples to the shared buffer while recording.
    fn sample_sink(&self) -> impl Fn(&[f32]) + Send + 'static {
        let buffer = Arc::clone(&self.buffer);
        let is_recording = Arc::clone(&self.is_recording);
        move |samples: &[f32]| {
            if !is_recording.load(Ordering::Relaxed) {
                return;
            }
            if let Ok(mut buf) = buffer.lock() {
                buf.extend_from_slice(samples);
            }
        }
    }
}

/// Map a backend error message onto the device error taxonomy.
fn classify(message: &str) -> VoiceError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("not permitted") || lower.contains("denied") {
        VoiceError::MicrophonePermissionDenied
    } else if lower.contains("not available") || lower.contains("no device") {
        VoiceError::NoInputDevice
    } else {
        VoiceError::InputStreamError(message.to_string())
    }
}

/// Average interleaved channels into mono.
fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = usize::from(channels);
    #[allow(clippy::cast_precision_loss)]
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, VoiceError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let wav_err = |e: hound::Error| VoiceError::InputStreamError(format!("WAV encoding: {e}"));
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_err)?;
        for &sample in samples {
            // f32 [-1, 1] → i16
            #[allow(clippy::cast_possible_truncation)]
            let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(s).map_err(wav_err)?;
        }
        writer.finalize().map_err(wav_err)?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_are_averaged() {
        let mono = to_mono(&[0.2, 0.4, -1.0, 1.0], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }

    #[test]
    fn wav_has_riff_header() {
        let wav = encode_wav(&[0.0, 0.5, -0.5], 16_000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(encode_wav(&[], 16_000).unwrap().is_empty());
    }

    #[test]
    fn permission_errors_are_recognised() {
        assert_eq!(
            classify("The requested device access was denied"),
            VoiceError::MicrophonePermissionDenied
        );
        assert!(matches!(classify("boom"), VoiceError::InputStreamError(_)));
    }
}
