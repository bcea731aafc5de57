//! Shared fixtures for session tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use coach_core::{CompletionError, CompletionPort, CompletionRequest, TokenStream};
use coach_session::{AutoReadToggle, SessionDeps, SessionEvent, SessionOptions};
use coach_voice::testing::{FakeMicrophone, ScriptedOutput, ScriptedSynthesizer, ScriptedTranscriber};
use coach_voice::{
    AudioEncoding, AudioOutput, AudioResourceManager, CaptureDevice, PlaybackEvent,
    SpeechPlaybackController, Synthesizer, Transcriber, VoiceCaptureController,
};
use futures_util::StreamExt;
use tokio::sync::mpsc;

/// One step of a scripted reply.
#[derive(Clone)]
pub enum Step {
    Delta(&'static str),
    Wait(Duration),
    Fail(CompletionError),
}

/// Completion backend that replays scripted replies in call order.
///
/// Once the scripts run out every call answers `"ok"`.
#[derive(Default)]
pub struct ScriptedCompletion {
    scripts: Mutex<VecDeque<Result<Vec<Step>, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().push_back(Ok(steps));
        self
    }

    pub fn refuse(self, error: CompletionError) -> Self {
        self.scripts.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionPort for ScriptedCompletion {
    async fn stream_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream, CompletionError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![Step::Delta("ok")]))?;

        let stream = futures_util::stream::unfold(script.into_iter(), |mut steps| async move {
            loop {
                match steps.next()? {
                    Step::Wait(d) => tokio::time::sleep(d).await,
                    Step::Delta(text) => return Some((Ok(text.to_string()), steps)),
                    Step::Fail(e) => return Some((Err(e), steps)),
                }
            }
        });
        Ok(stream.boxed())
    }
}

/// Speech output wired to scripted synthesis and a 1 s clip length.
pub struct Speech {
    pub controller: Arc<SpeechPlaybackController>,
    pub events: mpsc::UnboundedReceiver<PlaybackEvent>,
    pub synth: Arc<ScriptedSynthesizer>,
    pub output: Arc<ScriptedOutput>,
    pub resources: AudioResourceManager,
}

pub fn speech() -> Speech {
    let synth = Arc::new(ScriptedSynthesizer::new());
    let output = Arc::new(ScriptedOutput::new(Duration::from_secs(1)));
    let resources = AudioResourceManager::new();
    let (controller, events) = SpeechPlaybackController::new(
        Arc::clone(&synth) as Arc<dyn Synthesizer>,
        Arc::clone(&output) as Arc<dyn AudioOutput>,
        resources.clone(),
    );
    Speech {
        controller: Arc::new(controller),
        events,
        synth,
        output,
        resources,
    }
}

/// Microphone plus transcriber.
pub struct Voice {
    pub controller: Arc<VoiceCaptureController>,
    pub mic: Arc<FakeMicrophone>,
    pub transcriber: Arc<ScriptedTranscriber>,
}

pub fn voice(transcriber: ScriptedTranscriber) -> Voice {
    let mic = Arc::new(FakeMicrophone::new(
        vec![AudioEncoding::Webm],
        vec![Bytes::from_static(b"voice")],
    ));
    let transcriber = Arc::new(transcriber);
    let (controller, _events) = VoiceCaptureController::new(
        Arc::clone(&mic) as Arc<dyn CaptureDevice>,
        Arc::clone(&transcriber) as Arc<dyn Transcriber>,
        AudioResourceManager::new(),
    );
    Voice {
        controller: Arc::new(controller),
        mic,
        transcriber,
    }
}

pub fn deps(completion: &Arc<ScriptedCompletion>) -> SessionDeps {
    SessionDeps {
        completion: Arc::clone(completion) as Arc<dyn CompletionPort>,
        config: None,
        playback: None,
        capture: None,
        auto_read: AutoReadToggle::default(),
        options: SessionOptions {
            opening_delay: Duration::from_secs(3),
            auto_read_delay: Duration::from_millis(500),
            chunk_size: 200,
        },
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
}
