//! Coach configuration repository trait definition.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::CoachConfig;

/// Repository for the single coach configuration record.
///
/// # Design Rules
///
/// - No `sqlx` types in signatures
/// - `replace` is all-or-nothing: after it succeeds, `latest` returns exactly
///   the written record and nothing of the previous one survives
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Most recently written configuration, or `None` if nothing was stored yet.
    async fn latest(&self) -> Result<Option<CoachConfig>, RepositoryError>;

    /// Replace the stored configuration as a whole.
    async fn replace(&self, config: &CoachConfig) -> Result<(), RepositoryError>;
}
