//! Config store handlers (`/api/config`, alias `/api/admin`).

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use coach_core::{CoachConfig, CoachConfigDraft};

use crate::error::HttpError;
use crate::state::AppState;

/// Latest stored configuration, or `null` when none has been saved.
pub async fn get(State(state): State<AppState>) -> Result<Json<Option<CoachConfig>>, HttpError> {
    Ok(Json(state.config.latest().await?))
}

/// Replace the whole configuration.
///
/// Fields may be missing from the body; validation names every absent or
/// blank one and nothing is written.
pub async fn replace(
    State(state): State<AppState>,
    payload: Result<Json<CoachConfigDraft>, JsonRejection>,
) -> Result<Json<CoachConfig>, HttpError> {
    let Json(draft) = payload.map_err(|e| HttpError::BadRequest(e.body_text()))?;
    Ok(Json(state.config.replace_draft(draft).await?))
}
