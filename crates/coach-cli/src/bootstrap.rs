//! CLI bootstrap - the composition root for `coach chat`.
//!
//! This is the only place where the shell's collaborators are built: the
//! relay clients, the speech controllers and (with `local-audio`) the
//! microphone and speaker.

use std::sync::Arc;

use coach_core::{ClientSettings, CoachConfig, validate_settings};
use coach_session::{
    AutoReadToggle, ConfigClient, HttpCompletionClient, SessionDeps, SessionOptions,
};
use coach_voice::{
    AudioOutput, AudioResourceManager, CaptureDevice, CaptureEvent, ElevenLabsConfig,
    ElevenLabsSynthesizer, PlaybackEvent, RemoteTranscriber, SpeechPlaybackController,
    VoiceCaptureController,
};
use tokio::sync::mpsc;

use crate::commands::ChatArgs;
use crate::error::CliError;

/// Inputs for [`bootstrap_chat`].
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: ClientSettings,
    pub elevenlabs_api_key: Option<String>,
    /// Build speech output and voice capture when devices are available.
    pub voice: bool,
}

impl CliConfig {
    /// Settings from `coach chat` arguments and the global server URL.
    pub fn from_chat_args(args: &ChatArgs, server_url: Option<&str>) -> Self {
        let mut settings = ClientSettings {
            chunk_size: args.chunk_size,
            opening_delay_ms: args.opening_delay_ms,
            auto_read_delay_ms: args.auto_read_delay_ms,
            auto_read: args.auto_read,
            ..ClientSettings::default()
        };
        if let Some(url) = server_url {
            settings.server_url = url.to_string();
        }
        if let Some(voice) = args.voice_id.as_deref().filter(|v| !v.trim().is_empty()) {
            settings.voice_id = voice.to_string();
        }
        Self {
            settings,
            elevenlabs_api_key: args
                .elevenlabs_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            voice: !args.no_voice,
        }
    }
}

/// Everything the shell needs.
pub struct ChatContext {
    pub settings: ClientSettings,
    pub deps: SessionDeps,
    pub playback_events: Option<mpsc::UnboundedReceiver<PlaybackEvent>>,
    pub capture_events: Option<mpsc::UnboundedReceiver<CaptureEvent>>,
}

/// Validate settings, fetch the stored config once and wire the controllers.
pub async fn bootstrap_chat(config: CliConfig) -> Result<ChatContext, CliError> {
    let CliConfig {
        settings,
        elevenlabs_api_key,
        voice,
    } = config;
    validate_settings(&settings).map_err(|e| CliError::Config(e.to_string()))?;

    let base = settings.server_base();
    let coach_config = fetch_config(&ConfigClient::new(base)).await;

    let mut deps = SessionDeps {
        completion: Arc::new(HttpCompletionClient::new(base)),
        config: coach_config,
        playback: None,
        capture: None,
        auto_read: AutoReadToggle::new(settings.auto_read),
        options: SessionOptions::from(&settings),
    };
    let mut playback_events = None;
    let mut capture_events = None;

    if voice {
        if let Some((device, output)) = open_devices() {
            let resources = AudioResourceManager::new();

            if let Some(key) = elevenlabs_api_key {
                let synth = ElevenLabsSynthesizer::new(
                    ElevenLabsConfig::new(key)
                        .with_voice(settings.voice_id.clone())
                        .with_model(settings.tts_model_id.clone()),
                );
                let (controller, events) =
                    SpeechPlaybackController::new(Arc::new(synth), output, resources.clone());
                deps.playback = Some(Arc::new(controller));
                playback_events = Some(events);
            } else {
                tracing::info!("ELEVENLABS_API_KEY is not set; speech output disabled");
            }

            let (controller, events) = VoiceCaptureController::new(
                device,
                Arc::new(RemoteTranscriber::new(base)),
                resources,
            );
            deps.capture = Some(Arc::new(controller));
            capture_events = Some(events);
        }
    }

    tracing::debug!(
        server = %settings.server_url,
        speech = deps.playback.is_some(),
        microphone = deps.capture.is_some(),
        "Chat context ready"
    );

    Ok(ChatContext {
        settings,
        deps,
        playback_events,
        capture_events,
    })
}

/// Stored config, or `None` (built-in instructions) when it cannot be read.
async fn fetch_config(client: &ConfigClient) -> Option<CoachConfig> {
    match client.fetch().await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "Could not load the coach configuration, using built-in instructions: {}",
                e
            );
            None
        }
    }
}

#[cfg(feature = "local-audio")]
fn open_devices() -> Option<(Arc<dyn CaptureDevice>, Arc<dyn AudioOutput>)> {
    match coach_voice::local::open_local_audio() {
        Ok((device, output)) => {
            let device: Arc<dyn CaptureDevice> = Arc::new(device);
            let output: Arc<dyn AudioOutput> = Arc::new(output);
            Some((device, output))
        }
        Err(e) => {
            tracing::warn!("Audio devices unavailable, continuing text-only: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "local-audio"))]
fn open_devices() -> Option<(Arc<dyn CaptureDevice>, Arc<dyn AudioOutput>)> {
    tracing::info!("Built without the local-audio feature; voice is disabled");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Cli;
    use crate::commands::Commands;
    use clap::Parser;

    fn chat_args(argv: &[&str]) -> ChatArgs {
        let mut full = vec!["coach", "chat"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Some(Commands::Chat(args)) => args,
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn chat_args_fill_settings() {
        let args = chat_args(&["--auto-read", "--chunk-size", "120", "--voice-id", "v-1"]);
        let config = CliConfig::from_chat_args(&args, Some("http://coach.test:9000/"));

        assert!(config.settings.auto_read);
        assert_eq!(config.settings.chunk_size, 120);
        assert_eq!(config.settings.voice_id, "v-1");
        assert_eq!(config.settings.server_base(), "http://coach.test:9000");
        assert!(config.voice);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_before_any_request() {
        let args = chat_args(&["--chunk-size", "5", "--no-voice"]);
        let config = CliConfig::from_chat_args(&args, None);

        assert!(matches!(
            bootstrap_chat(config).await,
            Err(CliError::Config(_))
        ));
    }
}
