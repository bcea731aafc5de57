//! Config service - validated access to the coach configuration.

use std::sync::Arc;

use crate::domain::{CoachConfig, CoachConfigDraft};
use crate::ports::{ConfigRepository, CoreError};

/// Service for coach configuration operations.
pub struct ConfigService {
    repo: Arc<dyn ConfigRepository>,
}

impl ConfigService {
    /// Create a new config service.
    pub fn new(repo: Arc<dyn ConfigRepository>) -> Self {
        Self { repo }
    }

    /// Latest stored configuration, if any.
    pub async fn latest(&self) -> Result<Option<CoachConfig>, CoreError> {
        self.repo.latest().await.map_err(CoreError::from)
    }

    /// Replace the configuration. Nothing is written unless all five fields are non-blank.
    pub async fn replace(&self, config: CoachConfig) -> Result<CoachConfig, CoreError> {
        config.validate()?;
        self.repo.replace(&config).await?;
        tracing::info!(heading = %config.heading, "Coach configuration replaced");
        Ok(config)
    }

    /// Validate a partially-filled write request, then replace.
    pub async fn replace_draft(&self, draft: CoachConfigDraft) -> Result<CoachConfig, CoreError> {
        let config = CoachConfig::try_from(draft)?;
        self.replace(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RepositoryError;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Repo {}

        #[async_trait]
        impl ConfigRepository for Repo {
            async fn latest(&self) -> Result<Option<CoachConfig>, RepositoryError>;
            async fn replace(&self, config: &CoachConfig) -> Result<(), RepositoryError>;
        }
    }

    fn sample() -> CoachConfig {
        CoachConfig {
            heading: "H".into(),
            description: "D".into(),
            readymade_system_message: "R".into(),
            build_system_message: "B".into(),
            review_system_message: "V".into(),
        }
    }

    #[tokio::test]
    async fn latest_passes_through_empty_store() {
        let mut repo = MockRepo::new();
        repo.expect_latest().times(1).returning(|| Ok(None));
        let service = ConfigService::new(Arc::new(repo));

        assert!(service.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_writes_valid_config() {
        let mut repo = MockRepo::new();
        repo.expect_replace()
            .withf(|c| c.heading == "H" && c.review_system_message == "V")
            .times(1)
            .returning(|_| Ok(()));
        let service = ConfigService::new(Arc::new(repo));

        let saved = service.replace(sample()).await.unwrap();
        assert_eq!(saved, sample());
    }

    #[tokio::test]
    async fn invalid_config_never_reaches_repository() {
        let mut repo = MockRepo::new();
        repo.expect_replace().never();
        let service = ConfigService::new(Arc::new(repo));

        let config = CoachConfig {
            description: String::new(),
            ..sample()
        };
        let err = service.replace(config).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg.contains("description")));
    }

    #[tokio::test]
    async fn storage_errors_surface_as_repository_errors() {
        let mut repo = MockRepo::new();
        repo.expect_replace()
            .returning(|_| Err(RepositoryError::Storage("disk full".into())));
        let service = ConfigService::new(Arc::new(repo));

        let err = service.replace(sample()).await.unwrap_err();
        assert!(matches!(err, CoreError::Repository(RepositoryError::Storage(_))));
    }
}
