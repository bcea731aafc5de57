//! Interactive coaching shell.
//!
//! A readline thread hands lines to the async loop one at a time; the loop
//! also drains session, playback and capture events so streamed replies
//! print while the prompt waits.

mod command;
mod render;

pub use command::{CommandError, HELP, ShellCommand, parse_menu_choice};
pub use render::Renderer;

use std::io::Stdout;
use std::sync::mpsc as std_mpsc;

use coach_core::LearningMode;
use coach_session::{ConversationSession, SessionError, SessionEvent, SessionHost};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::bootstrap::ChatContext;
use crate::error::CliError;

const PROMPT: &str = "> ";

enum InputLine {
    Text(String),
    /// Ctrl-C at the prompt.
    Interrupted,
}

/// Readline on a dedicated thread. A line is only read after
/// [`request`](Self::request), so the terminal leaves raw mode whenever the
/// loop is not waiting for input.
struct LineReader {
    requests: std_mpsc::Sender<()>,
    lines: mpsc::Receiver<InputLine>,
}

impl LineReader {
    fn spawn() -> Result<Self, CliError> {
        let mut editor = DefaultEditor::new().map_err(|e| CliError::Io(e.to_string()))?;
        let (request_tx, request_rx) = std_mpsc::channel::<()>();
        let (line_tx, line_rx) = mpsc::channel(1);

        std::thread::Builder::new()
            .name("coach-readline".into())
            .spawn(move || {
                while request_rx.recv().is_ok() {
                    let line = match editor.readline(PROMPT) {
                        Ok(line) => {
                            if !line.trim().is_empty() {
                                let _ = editor.add_history_entry(line.as_str());
                            }
                            InputLine::Text(line)
                        }
                        Err(ReadlineError::Interrupted) => InputLine::Interrupted,
                        Err(ReadlineError::Eof) => break,
                        Err(e) => {
                            tracing::warn!("Terminal input failed: {}", e);
                            break;
                        }
                    };
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: request_tx,
            lines: line_rx,
        })
    }

    fn request(&self) {
        let _ = self.requests.send(());
    }

    /// `None` once input has ended (Ctrl-D).
    async fn next(&mut self) -> Option<InputLine> {
        self.lines.recv().await
    }
}

/// Receive from an optional channel; pending forever when there is none.
async fn recv_or_pending<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Shell {
    host: SessionHost,
    session_events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    renderer: Renderer<Stdout>,
}

/// Run the shell until `/quit`, Ctrl-D or a closed terminal.
pub async fn run(ctx: ChatContext, initial_mode: Option<LearningMode>) -> Result<(), CliError> {
    let ChatContext {
        settings,
        deps,
        mut playback_events,
        mut capture_events,
    } = ctx;

    let mut shell = Shell {
        host: SessionHost::new(deps),
        session_events: None,
        renderer: Renderer::new(std::io::stdout()),
    };
    let mut reader = LineReader::spawn()?;

    tracing::info!(server = %settings.server_base(), "Chat shell started");
    if shell.host.deps().capture.is_none() {
        shell.renderer.notice("(text only: voice input is unavailable)");
    }

    match initial_mode {
        Some(mode) => shell.open(mode),
        None => shell.show_menu(),
    }
    reader.request();

    loop {
        tokio::select! {
            line = reader.next() => {
                let Some(line) = line else { break };
                if shell.handle_input(line).await == Flow::Quit {
                    break;
                }
                reader.request();
            }
            event = recv_or_pending(&mut shell.session_events) => match event {
                Some(event) => shell.renderer.session_event(&event),
                None => shell.session_events = None,
            },
            event = recv_or_pending(&mut playback_events) => match event {
                Some(event) => shell.renderer.playback_event(&event),
                None => playback_events = None,
            },
            event = recv_or_pending(&mut capture_events) => match event {
                Some(event) => shell.renderer.capture_event(&event),
                None => capture_events = None,
            },
        }
    }

    shell.host.return_to_menu();
    shell.renderer.notice("Bye.");
    Ok(())
}

impl Shell {
    fn open(&mut self, mode: LearningMode) {
        self.renderer.session_opened(mode);
        self.session_events = Some(self.host.select_mode(mode));
    }

    fn show_menu(&mut self) {
        self.host.return_to_menu();
        self.session_events = None;
        self.renderer.menu(self.host.deps().config.as_ref());
    }

    async fn handle_input(&mut self, line: InputLine) -> Flow {
        let text = match line {
            InputLine::Text(text) => text,
            InputLine::Interrupted => {
                self.interrupt();
                return Flow::Continue;
            }
        };

        if self.host.current().is_none() {
            return self.handle_menu_line(&text);
        }

        match ShellCommand::parse(&text) {
            Ok(command) => self.handle_command(command).await,
            Err(e) => {
                self.renderer.notice(&e.to_string());
                Flow::Continue
            }
        }
    }

    fn handle_menu_line(&mut self, text: &str) -> Flow {
        match text.trim() {
            "" => {}
            "/quit" | "/exit" | "/q" => return Flow::Quit,
            choice => match parse_menu_choice(choice) {
                Some(mode) => self.open(mode),
                None => self.renderer.notice("Choose 1, 2 or 3."),
            },
        }
        Flow::Continue
    }

    /// Ctrl-C stops what is running; at rest it only hints how to leave.
    fn interrupt(&mut self) {
        let Some(session) = self.host.current() else {
            self.renderer.notice("(/quit or Ctrl-D to leave)");
            return;
        };
        if session.abort() {
            return;
        }
        if self.host.deps().capture.as_ref().is_some_and(|c| c.is_recording()) {
            session.cancel_recording();
            return;
        }
        self.renderer.notice("(/quit or Ctrl-D to leave)");
    }

    async fn handle_command(&mut self, command: ShellCommand) -> Flow {
        match command {
            ShellCommand::Quit => return Flow::Quit,
            ShellCommand::Help => self.renderer.notice(HELP),
            ShellCommand::Menu => self.show_menu(),
            ShellCommand::Mode(mode) => self.open(mode),
            other => {
                if let Some(session) = self.host.current() {
                    dispatch(session, other, &mut self.renderer).await;
                }
            }
        }
        Flow::Continue
    }
}

async fn dispatch(
    session: &ConversationSession,
    command: ShellCommand,
    renderer: &mut Renderer<Stdout>,
) {
    let result = match command {
        ShellCommand::Send(text) => {
            session.set_input(&text);
            session.submit_input()
        }
        ShellCommand::SubmitPending => {
            if session.input().trim().is_empty() {
                Ok(())
            } else {
                session.submit_input()
            }
        }
        ShellCommand::StartRecording => session.start_recording(),
        ShellCommand::StopRecording => session.stop_recording().await.map(|text| {
            renderer.notice(&format!(
                "Transcript: {text}\nPress Enter to send it, or type a message instead."
            ));
        }),
        ShellCommand::CancelRecording => {
            session.cancel_recording();
            Ok(())
        }
        ShellCommand::Retry => session.retry(),
        ShellCommand::Abort => {
            if !session.abort() {
                renderer.notice("Nothing is streaming.");
            }
            Ok(())
        }
        ShellCommand::Read(which) => match reply_id(session, which) {
            Some(id) => session.read_message(&id),
            None => {
                renderer.notice("No such reply.");
                Ok(())
            }
        },
        ShellCommand::StopReading => {
            session.stop_reading();
            Ok(())
        }
        ShellCommand::AutoRead(value) => {
            let enabled = value.unwrap_or(!session.auto_read().is_enabled());
            session.set_auto_read(enabled);
            renderer.notice(if enabled {
                "Auto-read on."
            } else {
                "Auto-read off."
            });
            Ok(())
        }
        ShellCommand::DismissError => {
            session.dismiss_error();
            Ok(())
        }
        ShellCommand::Quit | ShellCommand::Help | ShellCommand::Menu | ShellCommand::Mode(_) => {
            Ok(())
        }
    };

    // Reportable failures already arrive as session error events.
    if let Err(e) = result {
        if !e.is_reportable() {
            renderer.notice(&describe(&e));
        }
    }
}

fn describe(error: &SessionError) -> String {
    match error {
        SessionError::Closed => "The session has ended.".to_string(),
        other => other.to_string(),
    }
}

/// Id of the latest assistant reply, or of reply `n` counting from 1.
fn reply_id(session: &ConversationSession, which: Option<usize>) -> Option<String> {
    let replies: Vec<_> = session
        .messages()
        .into_iter()
        .filter(|m| m.is_assistant())
        .collect();
    let reply = match which {
        None => replies.last(),
        Some(n) => replies.get(n.checked_sub(1)?),
    };
    reply.map(|m| m.id.clone())
}
