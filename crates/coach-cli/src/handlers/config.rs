//! Config command handler.
//!
//! Shows or replaces the stored coach configuration through the running
//! server, the same way the admin page does.

use std::path::Path;

use coach_core::{CoachConfig, CoachConfigDraft, LearningMode};
use coach_session::ConfigClient;

use crate::config_commands::ConfigCommand;
use crate::error::CliError;

/// Values given to `config set`, before merging.
#[derive(Debug, Default, Clone)]
pub struct ConfigUpdate {
    pub heading: Option<String>,
    pub description: Option<String>,
    pub readymade: Option<String>,
    pub build: Option<String>,
    pub review: Option<String>,
}

impl ConfigUpdate {
    /// Fill fields missing here from a JSON draft. Flags win over the file.
    #[must_use]
    pub fn or_draft(self, draft: CoachConfigDraft) -> Self {
        Self {
            heading: self.heading.or(draft.heading),
            description: self.description.or(draft.description),
            readymade: self.readymade.or(draft.readymade_system_message),
            build: self.build.or(draft.build_system_message),
            review: self.review.or(draft.review_system_message),
        }
    }

    const fn is_empty(&self) -> bool {
        self.heading.is_none()
            && self.description.is_none()
            && self.readymade.is_none()
            && self.build.is_none()
            && self.review.is_none()
    }

    /// Overlay onto the current record. The result is written as a whole.
    #[must_use]
    pub fn apply(self, current: Option<CoachConfig>) -> CoachConfig {
        let base = current.unwrap_or_default();
        CoachConfig {
            heading: self.heading.unwrap_or(base.heading),
            description: self.description.unwrap_or(base.description),
            readymade_system_message: self.readymade.unwrap_or(base.readymade_system_message),
            build_system_message: self.build.unwrap_or(base.build_system_message),
            review_system_message: self.review.unwrap_or(base.review_system_message),
        }
    }
}

/// Execute the config command.
pub async fn execute(server_url: &str, command: ConfigCommand) -> Result<(), CliError> {
    let client = ConfigClient::new(server_url);
    match command {
        ConfigCommand::Show { json } => handle_show(&client, json).await,
        ConfigCommand::Set {
            file,
            heading,
            description,
            readymade,
            build,
            review,
        } => {
            let mut update = ConfigUpdate {
                heading,
                description,
                readymade,
                build,
                review,
            };
            if let Some(path) = file {
                update = update.or_draft(read_draft(&path)?);
            }
            handle_set(&client, update).await
        }
    }
}

async fn handle_show(client: &ConfigClient, json: bool) -> Result<(), CliError> {
    let config = client.fetch().await?;

    if json {
        let text = serde_json::to_string_pretty(&config)
            .map_err(|e| CliError::Core(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    let Some(config) = config else {
        println!("No configuration stored; the built-in instructions are in use.");
        return Ok(());
    };

    println!("Heading:     {}", config.heading);
    println!("Description: {}", config.description);
    for mode in LearningMode::ALL {
        println!();
        println!("[{}] {}", mode.as_str(), mode.title());
        println!("{}", config.system_message_for(mode));
    }
    Ok(())
}

async fn handle_set(client: &ConfigClient, update: ConfigUpdate) -> Result<(), CliError> {
    if update.is_empty() {
        return Err(CliError::Arguments(
            "Nothing to set; pass --file or at least one field flag".to_string(),
        ));
    }

    let current = client.fetch().await?;
    let next = update.apply(current);
    let saved = client.replace(&next).await?;

    println!("✓ Configuration saved: {}", saved.heading);
    Ok(())
}

fn read_draft(path: &Path) -> Result<CoachConfigDraft, CliError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Arguments(format!("{}: {e}", path.display())))
}
