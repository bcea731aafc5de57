//! Main commands enum and primary subcommands.

use clap::{Args, Subcommand};
use coach_core::DEFAULT_CHUNK_SIZE;
use coach_core::settings::{DEFAULT_AUTO_READ_DELAY_MS, DEFAULT_OPENING_DELAY_MS};

use crate::config_commands::ConfigCommand;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the coach server (config store, chat and transcription relays)
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "COACH_PORT", default_value_t = coach_core::DEFAULT_SERVER_PORT)]
        port: u16,
        /// SQLite URL of the config store (default: coach.db under the data directory)
        #[arg(long, env = "COACH_DATABASE_URL")]
        database_url: Option<String>,
        /// OpenAI credential for the relays
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_api_key: Option<String>,
        /// Restrict CORS to these origins (repeatable; default allows all)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },

    /// Start a coaching conversation in the terminal
    Chat(ChatArgs),

    /// View or replace the stored coach configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `coach chat`.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Open this mode directly (readymade, build, review) instead of the menu
    #[arg(short, long)]
    pub mode: Option<String>,
    /// Read finished replies aloud
    #[arg(long)]
    pub auto_read: bool,
    /// Target speech chunk length in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
    /// Delay before the opening message, in milliseconds
    #[arg(long, default_value_t = DEFAULT_OPENING_DELAY_MS)]
    pub opening_delay_ms: u64,
    /// Settle delay before auto-read starts, in milliseconds
    #[arg(long, default_value_t = DEFAULT_AUTO_READ_DELAY_MS)]
    pub auto_read_delay_ms: u64,
    /// ElevenLabs credential for speech output
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<String>,
    /// ElevenLabs voice
    #[arg(long, env = "ELEVENLABS_VOICE_ID")]
    pub voice_id: Option<String>,
    /// Text only: no microphone and no speech output
    #[arg(long)]
    pub no_voice: bool,
}

#[cfg(test)]
mod tests {
    use crate::parser::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn chat_defaults() {
        let cli = Cli::parse_from(["coach", "chat"]);
        let Some(Commands::Chat(args)) = cli.command else {
            panic!("expected chat");
        };
        assert_eq!(args.mode, None);
        assert!(!args.auto_read);
        assert_eq!(args.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(args.opening_delay_ms, DEFAULT_OPENING_DELAY_MS);
    }

    #[test]
    fn serve_accepts_repeated_origins() {
        let cli = Cli::parse_from([
            "coach",
            "serve",
            "--port",
            "9000",
            "--allow-origin",
            "http://a.test",
            "--allow-origin",
            "http://b.test",
        ]);
        let Some(Commands::Serve {
            port,
            allowed_origins,
            ..
        }) = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(port, 9000);
        assert_eq!(allowed_origins, vec!["http://a.test", "http://b.test"]);
    }
}
