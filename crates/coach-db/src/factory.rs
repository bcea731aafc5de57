//! Composition utilities for wiring `SQLite` backends.
//!
//! Construction only; no domain logic lives here.

use sqlx::SqlitePool;
use std::sync::Arc;

use coach_core::ConfigService;

use crate::repositories::SqliteConfigRepository;

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Create a `SQLite` connection pool.
    ///
    /// # Arguments
    ///
    /// * `db_url` - `SQLite` connection URL (e.g., "sqlite://coach.db")
    pub async fn create_pool(db_url: &str) -> anyhow::Result<SqlitePool> {
        let pool = SqlitePool::connect(db_url).await?;
        crate::setup::create_schema(&pool).await?;
        Ok(pool)
    }

    /// Create a config repository from a pool.
    pub fn config_repository(pool: SqlitePool) -> Arc<SqliteConfigRepository> {
        Arc::new(SqliteConfigRepository::new(pool))
    }

    /// Build a `ConfigService` backed by `SQLite`.
    pub fn config_service(pool: SqlitePool) -> ConfigService {
        ConfigService::new(Self::config_repository(pool))
    }
}

/// Test database helper for integration tests.
///
/// Provides an in-memory `SQLite` database with the production schema applied.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test database with full schema.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    /// Get a clone of the pool.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Config service over this database.
    pub fn config_service(&self) -> ConfigService {
        CoreFactory::config_service(self.pool())
    }
}
