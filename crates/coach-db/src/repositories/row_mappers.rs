//! Row → domain conversions.

use coach_core::{CoachConfig, RepositoryError};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub(crate) fn row_to_config(row: &SqliteRow) -> Result<CoachConfig, RepositoryError> {
    let get = |column: &str| -> Result<String, RepositoryError> {
        row.try_get::<String, _>(column)
            .map_err(|e| RepositoryError::Serialization(format!("{column}: {e}")))
    };

    Ok(CoachConfig {
        heading: get("heading")?,
        description: get("description")?,
        readymade_system_message: get("readymade_system_message")?,
        build_system_message: get("build_system_message")?,
        review_system_message: get("review_system_message")?,
    })
}
