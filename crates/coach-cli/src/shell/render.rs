//! Terminal output for session, playback and capture events.

use std::io::Write;

use coach_core::{CoachConfig, LearningMode, MessageRole};
use coach_session::SessionEvent;
use coach_voice::{CaptureEvent, CaptureStatus, PlaybackEvent};

const ASSISTANT_PREFIX: &str = "coach> ";

/// Writes events as they arrive. Streamed replies are printed inline on one
/// line that stays open until the reply ends or something else is printed.
pub struct Renderer<W: Write> {
    out: W,
    /// Message whose text is being streamed onto the current line.
    open_message: Option<String>,
}

impl<W: Write> Renderer<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            open_message: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn session_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::MessageAdded(message) => {
                if message.role != MessageRole::Assistant {
                    return;
                }
                self.end_line();
                if message.content.is_empty() {
                    self.write(ASSISTANT_PREFIX);
                    self.open_message = Some(message.id.clone());
                } else {
                    self.line(&format!("{ASSISTANT_PREFIX}{}", message.content));
                }
            }
            SessionEvent::MessageDelta { message_id, delta } => {
                if self.open_message.as_deref() != Some(message_id.as_str()) {
                    self.end_line();
                    self.write(ASSISTANT_PREFIX);
                    self.open_message = Some(message_id.clone());
                }
                self.write(delta);
            }
            SessionEvent::MessageRemoved { .. } => {
                self.end_line();
                self.line("(previous reply discarded)");
            }
            SessionEvent::RequestInFlight(false) | SessionEvent::Closed => self.end_line(),
            SessionEvent::ReadingArmed { .. } => self.notice("🔊 Reading the reply aloud (/stop to stop)"),
            SessionEvent::Error(message) => {
                self.notice(&format!("⚠️  {message}  (/retry to try again, /dismiss to clear)"));
            }
            SessionEvent::RequestInFlight(true)
            | SessionEvent::InputChanged(_)
            | SessionEvent::ErrorDismissed => {}
        }
    }

    pub fn playback_event(&mut self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::ReadingStopped { .. } => self.notice("Reading stopped."),
            PlaybackEvent::Error { message, .. } => {
                self.notice(&format!("⚠️  Speech failed: {message}"));
            }
            PlaybackEvent::StateChanged(_)
            | PlaybackEvent::ReadingStarted { .. }
            | PlaybackEvent::ReadingFinished { .. } => {}
        }
    }

    pub fn capture_event(&mut self, event: &CaptureEvent) {
        match event {
            CaptureEvent::StateChanged(state) => match state.status {
                CaptureStatus::Recording => {
                    self.notice("🎙  Recording... /done to finish, /cancel to discard");
                }
                CaptureStatus::Processing => self.notice("Transcribing..."),
                CaptureStatus::Idle | CaptureStatus::Error => {}
            },
            CaptureEvent::Error(message) => self.notice(&format!("⚠️  Microphone: {message}")),
            CaptureEvent::Elapsed(_) | CaptureEvent::Transcript(_) => {}
        }
    }

    /// Print a full line, closing any streamed reply first.
    pub fn notice(&mut self, text: &str) {
        self.end_line();
        self.line(text);
    }

    pub fn menu(&mut self, config: Option<&CoachConfig>) {
        self.end_line();
        if let Some(config) = config {
            self.line(&config.heading);
            self.line(&config.description);
        }
        self.line("");
        for (i, mode) in LearningMode::ALL.iter().enumerate() {
            self.line(&format!("  {}. {}  ({})", i + 1, mode.title(), mode.as_str()));
        }
        self.line("Choose a mode (1-3), or /quit.");
    }

    pub fn session_opened(&mut self, mode: LearningMode) {
        self.end_line();
        self.line(&format!("== {} ==", mode.title()));
        self.line("Type a message, or /help for commands.");
    }

    fn end_line(&mut self) {
        if self.open_message.take().is_some() {
            self.write("\n");
        }
    }

    fn line(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    fn write(&mut self, text: &str) {
        // Terminal write failures have nowhere better to go.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_core::ChatMessage;

    fn rendered(events: &[SessionEvent]) -> String {
        let mut renderer = Renderer::new(Vec::new());
        for event in events {
            renderer.session_event(event);
        }
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn streamed_reply_prints_on_one_line() {
        let out = rendered(&[
            SessionEvent::MessageAdded(ChatMessage::user("hi")),
            SessionEvent::RequestInFlight(true),
            SessionEvent::MessageDelta {
                message_id: "a1".into(),
                delta: "Hel".into(),
            },
            SessionEvent::MessageDelta {
                message_id: "a1".into(),
                delta: "lo".into(),
            },
            SessionEvent::RequestInFlight(false),
        ]);
        assert_eq!(out, "coach> Hello\n");
    }

    #[test]
    fn complete_assistant_message_is_one_line() {
        let out = rendered(&[SessionEvent::MessageAdded(ChatMessage::assistant(
            "Welcome!",
        ))]);
        assert_eq!(out, "coach> Welcome!\n");
    }

    #[test]
    fn error_closes_the_open_reply() {
        let out = rendered(&[
            SessionEvent::MessageDelta {
                message_id: "a1".into(),
                delta: "par".into(),
            },
            SessionEvent::Error("Failed to connect to AI: reset".into()),
        ]);
        assert!(out.starts_with("coach> par\n⚠️  Failed to connect to AI: reset"));
    }

    #[test]
    fn menu_lists_every_mode() {
        let mut renderer = Renderer::new(Vec::new());
        renderer.menu(None);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        for mode in LearningMode::ALL {
            assert!(out.contains(mode.title()));
        }
    }
}
