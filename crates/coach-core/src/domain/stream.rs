//! Wire frames of the chat relay stream.
//!
//! `POST /api/chat` answers with newline-delimited JSON, one frame per line:
//!
//! ```text
//! {"type":"delta","content":"Hel"}
//! {"type":"delta","content":"lo"}
//! {"type":"done"}
//! ```
//!
//! A stream ends with exactly one `done` or `error` frame.

use serde::{Deserialize, Serialize};

/// One line of the chat relay stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Delta { content: String },
    Done,
    Error { message: String },
}

impl StreamFrame {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_internally_tagged() {
        let delta = StreamFrame::Delta {
            content: "Hi".into(),
        };
        assert_eq!(
            serde_json::to_string(&delta).unwrap(),
            r#"{"type":"delta","content":"Hi"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamFrame::Done).unwrap(),
            r#"{"type":"done"}"#
        );

        let err: StreamFrame =
            serde_json::from_str(r#"{"type":"error","message":"boom"}"#).unwrap();
        assert!(err.is_terminal());
        assert!(!delta.is_terminal());
    }
}
