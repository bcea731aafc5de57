//! Process-wide auto-read switch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag deciding whether finished assistant messages are read aloud.
///
/// Clones share the flag, so one toggle outlives every session a
/// [`SessionHost`](crate::SessionHost) opens.
#[derive(Debug, Clone, Default)]
pub struct AutoReadToggle {
    enabled: Arc<AtomicBool>,
}

impl AutoReadToggle {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::debug!(enabled, "Auto-read toggled");
        }
    }

    /// Flip the flag and return the new value.
    pub fn toggle(&self) -> bool {
        let now = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        tracing::debug!(enabled = now, "Auto-read toggled");
        now
    }
}
