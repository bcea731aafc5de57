//! Mode selection lifecycle.

use coach_core::LearningMode;
use tokio::sync::mpsc;

use crate::autoread::AutoReadToggle;
use crate::session::{ConversationSession, SessionDeps, SessionEvent};

/// Owns the current [`ConversationSession`], if any.
///
/// Selecting a mode replaces the session; returning to the menu closes it.
/// Nothing (messages, timers, audio) carries over between sessions.
pub struct SessionHost {
    deps: SessionDeps,
    current: Option<ConversationSession>,
}

impl SessionHost {
    pub const fn new(deps: SessionDeps) -> Self {
        Self {
            deps,
            current: None,
        }
    }

    /// Close any current session and open one in `mode`.
    ///
    /// Returns the new session's event receiver.
    pub fn select_mode(&mut self, mode: LearningMode) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.return_to_menu();
        let (session, events) = ConversationSession::open(mode, self.deps.clone());
        self.current = Some(session);
        events
    }

    /// Close the current session, if any.
    pub fn return_to_menu(&mut self) {
        if let Some(session) = self.current.take() {
            session.close();
        }
    }

    pub const fn current(&self) -> Option<&ConversationSession> {
        self.current.as_ref()
    }

    pub fn current_mode(&self) -> Option<LearningMode> {
        self.current.as_ref().map(ConversationSession::mode)
    }

    pub const fn auto_read(&self) -> &AutoReadToggle {
        &self.deps.auto_read
    }

    pub const fn deps(&self) -> &SessionDeps {
        &self.deps
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        self.return_to_menu();
    }
}
