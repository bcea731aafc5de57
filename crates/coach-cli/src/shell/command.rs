//! Slash commands typed at the chat prompt.

use coach_core::LearningMode;

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Plain text: becomes the pending input and is sent.
    Send(String),
    /// Blank line: send the pending input (a transcript), if any.
    SubmitPending,
    StartRecording,
    StopRecording,
    CancelRecording,
    Retry,
    Abort,
    /// Read a message aloud. `None` reads the latest assistant reply;
    /// `Some(n)` counts assistant replies from 1.
    Read(Option<usize>),
    StopReading,
    /// Set the auto-read toggle, or flip it when no value is given.
    AutoRead(Option<bool>),
    DismissError,
    Menu,
    Mode(LearningMode),
    Help,
    Quit,
}

/// Rejected shell input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '/{0}'. Type /help for the list.")]
    Unknown(String),

    #[error("Unknown mode '{0}'. Choose readymade, build or review.")]
    UnknownMode(String),

    #[error("/{command} {detail}")]
    BadArgument {
        command: &'static str,
        detail: &'static str,
    },
}

impl ShellCommand {
    /// Parse one input line. Text not starting with `/` is a message.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Self::SubmitPending);
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Send(trimmed.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        let command = match name.as_str() {
            "mic" | "record" => Self::StartRecording,
            "done" => Self::StopRecording,
            "cancel" => Self::CancelRecording,
            "retry" => Self::Retry,
            "abort" => Self::Abort,
            "read" => match arg {
                None => Self::Read(None),
                Some(n) => match n.parse::<usize>() {
                    Ok(n) if n > 0 => Self::Read(Some(n)),
                    _ => {
                        return Err(CommandError::BadArgument {
                            command: "read",
                            detail: "takes a reply number starting at 1",
                        });
                    }
                },
            },
            "stop" => Self::StopReading,
            "autoread" => match arg.map(str::to_ascii_lowercase).as_deref() {
                None => Self::AutoRead(None),
                Some("on") => Self::AutoRead(Some(true)),
                Some("off") => Self::AutoRead(Some(false)),
                Some(_) => {
                    return Err(CommandError::BadArgument {
                        command: "autoread",
                        detail: "takes on or off",
                    });
                }
            },
            "dismiss" => Self::DismissError,
            "menu" | "back" => Self::Menu,
            "mode" => {
                let Some(tag) = arg else {
                    return Err(CommandError::BadArgument {
                        command: "mode",
                        detail: "takes readymade, build or review",
                    });
                };
                Self::Mode(
                    LearningMode::parse(tag)
                        .ok_or_else(|| CommandError::UnknownMode(tag.to_string()))?,
                )
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Menu choice: `1`-`3` or a mode slug.
pub fn parse_menu_choice(line: &str) -> Option<LearningMode> {
    let trimmed = line.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| LearningMode::ALL.get(i))
            .copied();
    }
    LearningMode::parse(trimmed)
}

pub const HELP: &str = "\
Type a message and press Enter to send it.

  /mic              start recording (voice builds only)
  /done             stop recording and transcribe; Enter sends the transcript
  /cancel           discard the recording
  /retry            ask again for the last message
  /abort            stop the reply that is streaming
  /read [n]         read the latest reply aloud, or reply number n
  /stop             stop reading
  /autoread [on|off]
  /dismiss          clear the error
  /menu             back to the mode menu
  /mode <name>      switch to readymade, build or review
  /quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_trimmed() {
        assert_eq!(
            ShellCommand::parse("  how do I start?  "),
            Ok(ShellCommand::Send("how do I start?".into()))
        );
    }

    #[test]
    fn blank_line_submits_pending_input() {
        assert_eq!(ShellCommand::parse("   "), Ok(ShellCommand::SubmitPending));
    }

    #[test]
    fn read_takes_an_optional_reply_number() {
        assert_eq!(ShellCommand::parse("/read"), Ok(ShellCommand::Read(None)));
        assert_eq!(ShellCommand::parse("/read 2"), Ok(ShellCommand::Read(Some(2))));
        assert!(ShellCommand::parse("/read 0").is_err());
        assert!(ShellCommand::parse("/read x").is_err());
    }

    #[test]
    fn autoread_accepts_on_off_or_nothing() {
        assert_eq!(ShellCommand::parse("/autoread"), Ok(ShellCommand::AutoRead(None)));
        assert_eq!(
            ShellCommand::parse("/AutoRead ON"),
            Ok(ShellCommand::AutoRead(Some(true)))
        );
        assert_eq!(
            ShellCommand::parse("/autoread off"),
            Ok(ShellCommand::AutoRead(Some(false)))
        );
        assert!(ShellCommand::parse("/autoread maybe").is_err());
    }

    #[test]
    fn mode_needs_a_known_slug() {
        assert_eq!(
            ShellCommand::parse("/mode review"),
            Ok(ShellCommand::Mode(LearningMode::Review))
        );
        assert_eq!(
            ShellCommand::parse("/mode chess"),
            Err(CommandError::UnknownMode("chess".into()))
        );
        assert!(ShellCommand::parse("/mode").is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            ShellCommand::parse("/dance"),
            Err(CommandError::Unknown("dance".into()))
        );
    }

    #[test]
    fn menu_accepts_numbers_and_slugs() {
        assert_eq!(parse_menu_choice("1"), Some(LearningMode::Readymade));
        assert_eq!(parse_menu_choice(" 3 "), Some(LearningMode::Review));
        assert_eq!(parse_menu_choice("build"), Some(LearningMode::Build));
        assert_eq!(parse_menu_choice("0"), None);
        assert_eq!(parse_menu_choice("4"), None);
        assert_eq!(parse_menu_choice("chess"), None);
    }
}
