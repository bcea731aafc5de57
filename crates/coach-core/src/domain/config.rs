//! Persisted coach configuration.

use serde::{Deserialize, Serialize};

use super::mode::LearningMode;

/// Heading, description, and one instruction text per mode.
///
/// Serialized with the camelCase field names used on the wire
/// (`readymadeSystemMessage`, ...). Replaced as a whole, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachConfig {
    pub heading: String,
    pub description: String,
    pub readymade_system_message: String,
    pub build_system_message: String,
    pub review_system_message: String,
}

/// Write request where any field may be missing.
///
/// Deserializing into this type lets the validation step name every absent
/// field instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachConfigDraft {
    pub heading: Option<String>,
    pub description: Option<String>,
    pub readymade_system_message: Option<String>,
    pub build_system_message: Option<String>,
    pub review_system_message: Option<String>,
}

/// Validation failure for a configuration write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields: {}", .missing.join(", "))]
pub struct ConfigValidationError {
    pub missing: Vec<&'static str>,
}

impl CoachConfig {
    /// Instruction text stored for `mode`.
    #[must_use]
    pub fn system_message_for(&self, mode: LearningMode) -> &str {
        match mode {
            LearningMode::Readymade => &self.readymade_system_message,
            LearningMode::Build => &self.build_system_message,
            LearningMode::Review => &self.review_system_message,
        }
    }

    /// Check that every field is present and non-blank.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let fields = [
            ("heading", self.heading.as_str()),
            ("description", self.description.as_str()),
            ("readymadeSystemMessage", self.readymade_system_message.as_str()),
            ("buildSystemMessage", self.build_system_message.as_str()),
            ("reviewSystemMessage", self.review_system_message.as_str()),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigValidationError { missing })
        }
    }
}

/// Resolve the instruction for `mode`: stored override first, built-in default otherwise.
#[must_use]
pub fn instruction_for(config: Option<&CoachConfig>, mode: LearningMode) -> String {
    config
        .map(|c| c.system_message_for(mode))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| mode.default_system_message())
        .to_string()
}

impl TryFrom<CoachConfigDraft> for CoachConfig {
    type Error = ConfigValidationError;

    fn try_from(draft: CoachConfigDraft) -> Result<Self, Self::Error> {
        let config = Self {
            heading: draft.heading.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            readymade_system_message: draft.readymade_system_message.unwrap_or_default(),
            build_system_message: draft.build_system_message.unwrap_or_default(),
            review_system_message: draft.review_system_message.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
