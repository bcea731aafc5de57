//! `SQLite` implementation of the `ConfigRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use coach_core::{CoachConfig, ConfigRepository, RepositoryError};

use super::row_mappers::row_to_config;

/// `SQLite` implementation of the `ConfigRepository` trait.
///
/// Writes replace the table contents inside one transaction.
pub struct SqliteConfigRepository {
    pool: SqlitePool,
}

impl SqliteConfigRepository {
    /// Create a new `SQLite` config repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

#[async_trait]
impl ConfigRepository for SqliteConfigRepository {
    async fn latest(&self) -> Result<Option<CoachConfig>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT heading, description, readymade_system_message,
                   build_system_message, review_system_message
            FROM coach_config
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(row_to_config).transpose()
    }

    async fn replace(&self, config: &CoachConfig) -> Result<(), RepositoryError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query("DELETE FROM coach_config")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO coach_config (
                heading, description, readymade_system_message,
                build_system_message, review_system_message, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&config.heading)
        .bind(&config.description)
        .bind(&config.readymade_system_message)
        .bind(&config.build_system_message)
        .bind(&config.review_system_message)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        tracing::debug!("coach_config replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    fn config(tag: &str) -> CoachConfig {
        CoachConfig {
            heading: format!("H{tag}"),
            description: format!("D{tag}"),
            readymade_system_message: format!("R{tag}"),
            build_system_message: format!("B{tag}"),
            review_system_message: format!("V{tag}"),
        }
    }

    #[tokio::test]
    async fn test_latest_is_none_when_empty() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteConfigRepository::new(pool);

        assert!(repo.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_then_latest() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteConfigRepository::new(pool);

        repo.replace(&config("1")).await.unwrap();
        assert_eq!(repo.latest().await.unwrap(), Some(config("1")));
    }

    #[tokio::test]
    async fn test_second_replace_leaves_single_row() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqliteConfigRepository::new(pool.clone());

        repo.replace(&config("1")).await.unwrap();
        repo.replace(&config("2")).await.unwrap();

        assert_eq!(repo.latest().await.unwrap(), Some(config("2")));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coach_config")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
