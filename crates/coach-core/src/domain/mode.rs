//! Learning modes and the per-mode profile table.
//!
//! Every mode-specific constant (slug, title, opening call-to-action,
//! built-in instruction text) lives in [`PROFILES`]. The session, the shell
//! and the chat relay all consult this table instead of branching on strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Instruction used by the chat relay when a request names no known mode.
pub const GENERIC_SYSTEM_MESSAGE: &str =
    "You are a helpful educational AI assistant focused on teaching compassionate feedback techniques.";

/// One of the three fixed conversation contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningMode {
    /// Rehearsal and teach-back practice.
    Readymade,
    /// Preparation for, and reflection on, real conversations.
    Build,
    /// Review of the learning pathway and exploration of ideas.
    Review,
}

/// Static description of a [`LearningMode`].
#[derive(Debug, Clone, Copy)]
pub struct ModeProfile {
    pub mode: LearningMode,
    /// Wire tag (`readymade`, `build`, `review`).
    pub slug: &'static str,
    /// Menu title.
    pub title: &'static str,
    /// Assistant message inserted once after the mode is opened.
    pub opening_message: &'static str,
    /// Instruction text used when no stored configuration overrides it.
    pub default_system_message: &'static str,
}

/// The mode table, in menu order.
pub static PROFILES: [ModeProfile; 3] = [
    ModeProfile {
        mode: LearningMode::Readymade,
        slug: "readymade",
        title: "Rehearse & Explain",
        opening_message: "Let's Build fluency by practicing conversations and explaining concepts in your own words. To start, type 'begin' ",
        default_system_message: include_str!("../prompts/readymade.md"),
    },
    ModeProfile {
        mode: LearningMode::Build,
        slug: "build",
        title: "Prepare & Reflect",
        opening_message: "Let's Prepare for a real conversation, then reflect to grow from it. To start, type 'begin' ",
        default_system_message: include_str!("../prompts/build.md"),
    },
    ModeProfile {
        mode: LearningMode::Review,
        slug: "review",
        title: "Review & Relate",
        opening_message: "Let's Revisit ideas, spark questions, and connect insights to your daily work. To start, type 'begin' ",
        default_system_message: include_str!("../prompts/review.md"),
    },
];

impl LearningMode {
    /// All modes in menu order.
    pub const ALL: [Self; 3] = [Self::Readymade, Self::Build, Self::Review];

    /// Look up this mode's row in [`PROFILES`].
    #[must_use]
    pub fn profile(self) -> &'static ModeProfile {
        match self {
            Self::Readymade => &PROFILES[0],
            Self::Build => &PROFILES[1],
            Self::Review => &PROFILES[2],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.profile().slug
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        self.profile().title
    }

    #[must_use]
    pub fn opening_message(self) -> &'static str {
        self.profile().opening_message
    }

    /// Stable id of the opening message for this mode.
    #[must_use]
    pub fn opening_message_id(self) -> String {
        format!("assistant-initial-{}", self.as_str())
    }

    #[must_use]
    pub fn default_system_message(self) -> &'static str {
        self.profile().default_system_message
    }

    /// Parse a wire tag, case-insensitively. Returns `None` for unknown tags.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        PROFILES
            .iter()
            .find(|p| p.slug.eq_ignore_ascii_case(tag))
            .map(|p| p.mode)
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mode tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown learning mode '{0}' (expected readymade, build or review)")]
pub struct UnknownModeError(pub String);

impl FromStr for LearningMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownModeError(s.to_string()))
    }
}
