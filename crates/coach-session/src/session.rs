//! One conversation in one learning mode.
//!
//! ```text
//!   open ──(opening_delay)──▶ opening message ─┐
//!     │                                        ▼
//!     └──── submit ──▶ in flight ──deltas──▶ reply ──(auto_read_delay)──▶ read aloud
//!                         │  ▲
//!                 abort ──┘  └── retry
//! ```
//!
//! All state lives behind one `std::sync::Mutex` that is never held across
//! an `.await`. Background work (the opening timer, the request task, the
//! auto-read timer) carries the session generation it was started under and
//! drops its result if the session was closed in the meantime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coach_core::{
    ChatMessage, ClientSettings, CoachConfig, CompletionError, CompletionPort, CompletionRequest,
    LearningMode, MessageRole, instruction_for,
};
use coach_voice::{SpeechPlaybackController, VoiceCaptureController, VoiceError};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::autoread::AutoReadToggle;
use crate::error::SessionError;

// ── Configuration ──────────────────────────────────────────────────

/// Timing and chunking knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Wait before the opening message appears.
    pub opening_delay: Duration,
    /// Settle time between a reply finishing and auto-read starting.
    pub auto_read_delay: Duration,
    /// Target chunk length for speech.
    pub chunk_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for SessionOptions {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            opening_delay: settings.opening_delay(),
            auto_read_delay: settings.auto_read_delay(),
            chunk_size: settings.chunk_size,
        }
    }
}

/// Collaborators shared by every session of a process.
#[derive(Clone)]
pub struct SessionDeps {
    pub completion: Arc<dyn CompletionPort>,
    /// Stored coach configuration, fetched once at startup.
    pub config: Option<CoachConfig>,
    pub playback: Option<Arc<SpeechPlaybackController>>,
    pub capture: Option<Arc<VoiceCaptureController>>,
    pub auto_read: AutoReadToggle,
    pub options: SessionOptions,
}

impl SessionDeps {
    /// Text-only dependencies: no speech output and no microphone.
    pub fn text_only(completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            completion,
            config: None,
            playback: None,
            capture: None,
            auto_read: AutoReadToggle::default(),
            options: SessionOptions::default(),
        }
    }
}

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was appended to the history.
    MessageAdded(ChatMessage),

    /// Streamed text was appended to a message.
    MessageDelta { message_id: String, delta: String },

    /// A message was dropped from the end of the history (retry).
    MessageRemoved { message_id: String },

    /// The in-flight flag changed.
    RequestInFlight(bool),

    /// The pending input changed (transcript, or cleared by submit).
    InputChanged(String),

    /// Auto-read started reading a message.
    ReadingArmed { message_id: String },

    /// A failure the user should see.
    Error(String),

    /// The current error was dismissed.
    ErrorDismissed,

    /// The session was closed; nothing else follows.
    Closed,
}

// ── State ──────────────────────────────────────────────────────────

struct RequestTask {
    id: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RequestTask {
    fn halt(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Settle timer for one auto-read.
struct PendingRead {
    message_id: String,
    task: JoinHandle<()>,
}

impl PendingRead {
    fn abort(self) {
        self.task.abort();
    }
}

struct Inner {
    messages: Vec<ChatMessage>,
    input: String,
    request: Option<RequestTask>,
    next_request_id: u64,
    /// Assistant message receiving the current response's deltas.
    streaming_message_id: Option<String>,
    opening_timer: Option<JoinHandle<()>>,
    opening_message_sent: bool,
    auto_read_timer: Option<PendingRead>,
    last_seen_assistant_id: Option<String>,
    last_error: Option<String>,
    generation: u64,
    closed: bool,
}

impl Inner {
    const fn in_flight(&self) -> bool {
        self.request.is_some()
    }
}

struct Shared {
    id: String,
    mode: LearningMode,
    inner: Mutex<Inner>,
    deps: SessionDeps,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

/// A single chat in one learning mode.
///
/// Created by [`open`](Self::open); closing (or dropping) it stops every
/// timer, the request, playback and recording.
pub struct ConversationSession {
    shared: Arc<Shared>,
}

impl ConversationSession {
    /// Open a session and schedule its opening message.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn open(
        mode: LearningMode,
        deps: SessionDeps,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            inner: Mutex::new(Inner {
                messages: Vec::new(),
                input: String::new(),
                request: None,
                next_request_id: 0,
                streaming_message_id: None,
                opening_timer: None,
                opening_message_sent: false,
                auto_read_timer: None,
                last_seen_assistant_id: None,
                last_error: None,
                generation: 0,
                closed: false,
            }),
            deps,
            event_tx,
        });

        {
            let mut inner = shared.lock();
            inner.opening_timer = Some(tokio::spawn(run_opening_timer(
                Arc::clone(&shared),
                inner.generation,
                shared.deps.options.opening_delay,
            )));
        }

        tracing::info!(session_id = %shared.id, %mode, "Session opened");
        (Self { shared }, event_rx)
    }

    // ── Queries ────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn mode(&self) -> LearningMode {
        self.shared.mode
    }

    /// Snapshot of the history.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.lock().messages.clone()
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.shared.lock().in_flight()
    }

    pub fn opening_message_sent(&self) -> bool {
        self.shared.lock().opening_message_sent
    }

    /// Whether the opening timer is still waiting.
    pub fn is_opening_pending(&self) -> bool {
        self.shared
            .lock()
            .opening_timer
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub fn input(&self) -> String {
        self.shared.lock().input.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn auto_read(&self) -> &AutoReadToggle {
        &self.shared.deps.auto_read
    }

    // ── Text turns ─────────────────────────────────────────────────

    /// Replace the pending input.
    pub fn set_input(&self, text: &str) {
        let mut inner = self.shared.lock();
        if inner.closed {
            return;
        }
        text.clone_into(&mut inner.input);
        self.shared.emit(SessionEvent::InputChanged(inner.input.clone()));
    }

    /// Send the pending input.
    pub fn submit_input(&self) -> Result<(), SessionError> {
        let input = self.input();
        self.submit(&input)
    }

    /// Send `text` as the next user message and stream the reply.
    ///
    /// Rejected while a reply is in flight; nothing is queued.
    pub fn submit(&self, text: &str) -> Result<(), SessionError> {
        let shared = &self.shared;
        let result = {
            let mut inner = shared.lock();
            shared.submit_locked(&mut inner, text)
        };
        shared.report(result)
    }

    /// Re-send the history up to the last user message.
    ///
    /// A trailing assistant reply is discarded first; the user message is
    /// never duplicated.
    pub fn retry(&self) -> Result<(), SessionError> {
        let shared = &self.shared;
        let result = {
            let mut inner = shared.lock();
            shared.retry_locked(&mut inner)
        };
        shared.report(result)
    }

    /// Cancel the in-flight request, keeping whatever already streamed.
    ///
    /// Returns `false` when nothing was in flight.
    pub fn abort(&self) -> bool {
        let shared = &self.shared;
        let mut inner = shared.lock();
        let Some(request) = inner.request.take() else {
            return false;
        };
        request.halt();
        tracing::info!(session_id = %shared.id, "Request aborted");
        shared.request_ended(&mut inner);
        true
    }

    // ── Reading aloud ──────────────────────────────────────────────

    /// Read one message aloud, stopping any other reading first.
    pub fn read_message(&self, message_id: &str) -> Result<(), SessionError> {
        let result = self.shared.read_message(message_id);
        self.shared.report(result)
    }

    /// Stop the current reading and any pending auto-read.
    pub fn stop_reading(&self) {
        let timer = self.shared.lock().auto_read_timer.take();
        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(playback) = &self.shared.deps.playback {
            playback.stop();
        }
    }

    /// Turn auto-read on or off. Turning it off also stops reading.
    pub fn set_auto_read(&self, enabled: bool) {
        self.shared.deps.auto_read.set(enabled);
        if !enabled {
            self.stop_reading();
        }
    }

    // ── Voice input ────────────────────────────────────────────────

    /// Start recording an utterance.
    pub fn start_recording(&self) -> Result<(), SessionError> {
        let result = self.start_recording_inner();
        self.shared.report(result)
    }

    fn start_recording_inner(&self) -> Result<(), SessionError> {
        if self.shared.lock().closed {
            return Err(SessionError::Closed);
        }
        let capture = self.shared.capture()?;
        capture.start()?;
        Ok(())
    }

    /// Finish the recording and put the transcript into the pending input.
    ///
    /// On failure the input is left untouched.
    pub async fn stop_recording(&self) -> Result<String, SessionError> {
        let generation = {
            let inner = self.shared.lock();
            if inner.closed {
                return Err(SessionError::Closed);
            }
            inner.generation
        };

        let result = match self.shared.capture() {
            Ok(capture) => capture.stop().await.map_err(SessionError::from),
            Err(e) => Err(e),
        };

        let mut inner = self.shared.lock();
        if inner.closed || inner.generation != generation {
            return Err(SessionError::Closed);
        }

        match result {
            Ok(text) => {
                text.clone_into(&mut inner.input);
                self.shared.emit(SessionEvent::InputChanged(text.clone()));
                tracing::debug!(session_id = %self.shared.id, "Transcript placed in input");
                Ok(text)
            }
            Err(e) => {
                drop(inner);
                self.shared.report(Err(e))
            }
        }
    }

    /// Discard the current recording, if any.
    pub fn cancel_recording(&self) {
        if let Some(capture) = &self.shared.deps.capture {
            capture.cancel();
        }
    }

    // ── Errors ─────────────────────────────────────────────────────

    pub fn dismiss_error(&self) {
        let mut inner = self.shared.lock();
        if inner.last_error.take().is_some() {
            self.shared.emit(SessionEvent::ErrorDismissed);
        }
    }

    // ── Teardown ───────────────────────────────────────────────────

    /// Stop everything and clear the history. Idempotent.
    pub fn close(&self) {
        let shared = &self.shared;
        {
            let mut inner = shared.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.generation += 1;

            if let Some(request) = inner.request.take() {
                request.halt();
            }
            if let Some(timer) = inner.opening_timer.take() {
                timer.abort();
            }
            if let Some(timer) = inner.auto_read_timer.take() {
                timer.abort();
            }
            inner.messages.clear();
            inner.input.clear();
            inner.streaming_message_id = None;
            inner.last_error = None;
        }

        if let Some(playback) = &shared.deps.playback {
            playback.stop();
        }
        if let Some(capture) = &shared.deps.capture {
            capture.cancel();
        }

        tracing::info!(session_id = %shared.id, mode = %shared.mode, "Session closed");
        shared.emit(SessionEvent::Closed);
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Shared internals ───────────────────────────────────────────────

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Session event receiver dropped");
        }
    }

    /// Record a failure as the session's visible error.
    fn report<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            if e.is_reportable() {
                self.set_error(&mut self.lock(), e.to_string());
            }
        }
        result
    }

    fn set_error(&self, inner: &mut Inner, message: String) {
        if inner.closed {
            return;
        }
        tracing::warn!(session_id = %self.id, error = %message, "Session error");
        inner.last_error = Some(message.clone());
        self.emit(SessionEvent::Error(message));
    }

    fn capture(&self) -> Result<&Arc<VoiceCaptureController>, SessionError> {
        self.deps
            .capture
            .as_ref()
            .ok_or(SessionError::Voice(VoiceError::NoInputDevice))
    }

    fn submit_locked(self: &Arc<Self>, inner: &mut Inner, text: &str) -> Result<(), SessionError> {
        if inner.closed {
            return Err(SessionError::Closed);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::Validation(
                "Message cannot be empty".to_string(),
            ));
        }
        if inner.in_flight() {
            return Err(SessionError::RequestInFlight);
        }

        // The user spoke first: no opening message, ever.
        if let Some(timer) = inner.opening_timer.take() {
            timer.abort();
        }

        let message = ChatMessage::user(text);
        tracing::info!(session_id = %self.id, message_id = %message.id, "User message submitted");
        inner.messages.push(message.clone());
        self.emit(SessionEvent::MessageAdded(message));

        if !inner.input.is_empty() {
            inner.input.clear();
            self.emit(SessionEvent::InputChanged(String::new()));
        }

        self.start_request(inner);
        Ok(())
    }

    fn retry_locked(self: &Arc<Self>, inner: &mut Inner) -> Result<(), SessionError> {
        if inner.closed {
            return Err(SessionError::Closed);
        }
        if inner.in_flight() {
            return Err(SessionError::RequestInFlight);
        }
        let last_user = inner
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::User)
            .ok_or(SessionError::NothingToRetry)?;

        let removed: Vec<String> = inner
            .messages
            .drain(last_user + 1..)
            .map(|m| m.id)
            .collect();
        self.forget_removed(inner, &removed);
        for message_id in removed {
            self.emit(SessionEvent::MessageRemoved { message_id });
        }

        if inner.last_error.take().is_some() {
            self.emit(SessionEvent::ErrorDismissed);
        }

        tracing::info!(session_id = %self.id, "Retrying last request");
        self.start_request(inner);
        Ok(())
    }

    /// Spawn the request task for the current history.
    fn start_request(self: &Arc<Self>, inner: &mut Inner) {
        let request = CompletionRequest {
            mode: Some(self.mode),
            messages: inner.messages.iter().map(ChatMessage::to_wire).collect(),
            system_message: instruction_for(self.deps.config.as_ref(), self.mode),
        };

        inner.next_request_id += 1;
        let id = inner.next_request_id;
        let cancel = CancellationToken::new();
        inner.streaming_message_id = None;

        let task = tokio::spawn(run_request(
            Arc::clone(self),
            inner.generation,
            id,
            request,
            cancel.clone(),
        ));
        inner.request = Some(RequestTask {
            id,
            cancel,
            task: Some(task),
        });

        tracing::debug!(session_id = %self.id, request_id = id, "Request in flight");
        self.emit(SessionEvent::RequestInFlight(true));
    }

    /// Whether `request_id` started under `generation` is still the live request.
    fn is_current(inner: &Inner, generation: u64, request_id: u64) -> bool {
        !inner.closed
            && inner.generation == generation
            && inner.request.as_ref().is_some_and(|r| r.id == request_id)
    }

    fn apply_delta(&self, generation: u64, request_id: u64, delta: &str) -> bool {
        let mut inner = self.lock();
        if !Self::is_current(&inner, generation, request_id) {
            return false;
        }
        if delta.is_empty() {
            return true;
        }

        let inner = &mut *inner;
        let position = inner
            .streaming_message_id
            .as_ref()
            .and_then(|id| inner.messages.iter().position(|m| &m.id == id));
        match position {
            Some(index) => {
                let message = &mut inner.messages[index];
                message.content.push_str(delta);
                let message_id = message.id.clone();
                self.emit(SessionEvent::MessageDelta {
                    message_id,
                    delta: delta.to_string(),
                });
            }
            None => {
                let message = ChatMessage::assistant(delta);
                inner.streaming_message_id = Some(message.id.clone());
                inner.messages.push(message.clone());
                self.emit(SessionEvent::MessageAdded(message));
            }
        }
        true
    }

    /// Close out a request from its own task.
    fn finish_request(
        self: &Arc<Self>,
        generation: u64,
        request_id: u64,
        outcome: Result<(), CompletionError>,
    ) {
        let mut inner = self.lock();
        if !Self::is_current(&inner, generation, request_id) {
            return;
        }
        // The caller is the task itself.
        inner.request.take();

        match outcome {
            Ok(()) => {
                tracing::info!(session_id = %self.id, request_id, "Response complete");
            }
            Err(e) => {
                let message = SessionError::Completion(e).to_string();
                self.set_error(&mut inner, message);
            }
        }
        self.request_ended(&mut inner);
    }

    /// Clear the in-flight flag (exactly once per request) and re-check auto-read.
    fn request_ended(self: &Arc<Self>, inner: &mut Inner) {
        inner.streaming_message_id = None;
        self.emit(SessionEvent::RequestInFlight(false));
        self.check_auto_read(inner);
    }

    fn insert_opening(self: &Arc<Self>, generation: u64) {
        let mut inner = self.lock();
        if inner.closed || inner.generation != generation {
            return;
        }
        inner.opening_timer = None;
        if inner.opening_message_sent || !inner.messages.is_empty() {
            return;
        }

        let message = ChatMessage::with_id(
            self.mode.opening_message_id(),
            MessageRole::Assistant,
            self.mode.opening_message(),
        );
        inner.messages.push(message.clone());
        inner.opening_message_sent = true;
        tracing::info!(session_id = %self.id, mode = %self.mode, "Opening message inserted");
        self.emit(SessionEvent::MessageAdded(message));
        self.check_auto_read(&mut inner);
    }

    /// Arm auto-read for the newest assistant message if it is new and final.
    fn check_auto_read(self: &Arc<Self>, inner: &mut Inner) {
        if inner.in_flight() {
            return;
        }
        let Some(last) = inner.messages.last() else {
            return;
        };
        if !last.is_assistant() || inner.last_seen_assistant_id.as_deref() == Some(&last.id) {
            return;
        }

        let message_id = last.id.clone();
        inner.last_seen_assistant_id = Some(message_id.clone());

        if !self.deps.auto_read.is_enabled() || self.deps.playback.is_none() {
            return;
        }

        if let Some(timer) = inner.auto_read_timer.take() {
            timer.abort();
        }
        tracing::debug!(session_id = %self.id, %message_id, "Auto-read armed");
        let task = tokio::spawn(run_auto_read_timer(
            Arc::clone(self),
            inner.generation,
            message_id.clone(),
            self.deps.options.auto_read_delay,
        ));
        inner.auto_read_timer = Some(PendingRead { message_id, task });
    }

    /// Drop auto-read and playback state that points at removed messages.
    fn forget_removed(&self, inner: &mut Inner, removed: &[String]) {
        if removed.is_empty() {
            return;
        }
        let is_removed = |id: &str| removed.iter().any(|r| r == id);

        if inner
            .auto_read_timer
            .as_ref()
            .is_some_and(|timer| is_removed(timer.message_id.as_str()))
        {
            if let Some(timer) = inner.auto_read_timer.take() {
                timer.abort();
            }
        }
        if inner.last_seen_assistant_id.as_deref().is_some_and(is_removed) {
            inner.last_seen_assistant_id = None;
        }
        if let Some(playback) = &self.deps.playback {
            let state = playback.state();
            if state.is_active() && state.active_message_id.as_deref().is_some_and(is_removed) {
                tracing::debug!(session_id = %self.id, "Stopping reading of a removed reply");
                playback.stop();
            }
        }
    }

    fn read_message(&self, message_id: &str) -> Result<(), SessionError> {
        let inner = self.lock();
        self.read_locked(&inner, message_id)
    }

    /// Start reading while the session lock is held, so `close()` cannot slip
    /// in between the checks and the start.
    fn read_locked(&self, inner: &Inner, message_id: &str) -> Result<(), SessionError> {
        if inner.closed {
            return Err(SessionError::Closed);
        }
        if inner.streaming_message_id.as_deref() == Some(message_id) {
            return Err(SessionError::Validation(
                "That reply is still streaming; read it once it has finished".to_string(),
            ));
        }
        let content = inner
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.content.as_str())
            .ok_or_else(|| SessionError::Validation(format!("No message with id {message_id}")))?;

        let playback = self.deps.playback.as_ref().ok_or_else(|| {
            SessionError::Voice(VoiceError::OutputStreamError(
                "speech output is not available".to_string(),
            ))
        })?;

        playback.stop();
        playback.start_text(message_id, content, self.deps.options.chunk_size)?;
        tracing::info!(session_id = %self.id, %message_id, "Reading message");
        Ok(())
    }

    fn auto_read_fired(&self, generation: u64, message_id: &str) {
        let mut inner = self.lock();
        if inner.closed || inner.generation != generation {
            return;
        }
        if inner
            .auto_read_timer
            .as_ref()
            .is_some_and(|timer| timer.message_id == message_id)
        {
            inner.auto_read_timer = None;
        }
        // The toggle may have been switched off during the settle delay.
        if !self.deps.auto_read.is_enabled() {
            return;
        }
        match self.read_locked(&inner, message_id) {
            Ok(()) => self.emit(SessionEvent::ReadingArmed {
                message_id: message_id.to_string(),
            }),
            Err(e) if e.is_reportable() => self.set_error(&mut inner, e.to_string()),
            Err(_) => {}
        }
    }
}

// ── Background tasks ───────────────────────────────────────────────

async fn run_opening_timer(shared: Arc<Shared>, generation: u64, delay: Duration) {
    tokio::time::sleep(delay).await;
    shared.insert_opening(generation);
}

async fn run_auto_read_timer(
    shared: Arc<Shared>,
    generation: u64,
    message_id: String,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    shared.auto_read_fired(generation, &message_id);
}

async fn run_request(
    shared: Arc<Shared>,
    generation: u64,
    request_id: u64,
    request: CompletionRequest,
    cancel: CancellationToken,
) {
    let started = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = shared.deps.completion.stream_completion(request) => result,
    };

    let mut stream = match started {
        Ok(stream) => stream,
        Err(e) => {
            shared.finish_request(generation, request_id, Err(e));
            return;
        }
    };

    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(delta)) => {
                if !shared.apply_delta(generation, request_id, &delta) {
                    return;
                }
            }
            Some(Err(e)) => {
                shared.finish_request(generation, request_id, Err(e));
                return;
            }
            None => {
                shared.finish_request(generation, request_id, Ok(()));
                return;
            }
        }
    }
}
