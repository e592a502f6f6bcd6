//! Note HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use recall_core::{CreateNoteRequest, Note, NoteSummary, ProcessingReport};

use crate::{ApiError, AppState};

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.service.create_note(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<NoteSummary>>, ApiError> {
    Ok(Json(state.service.list_notes().await?))
}

/// GET /notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.service.get_note(id).await?))
}

/// DELETE /notes/:id
///
/// Removes the note with its concepts, cards and review history.
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_note(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /notes/:id/process
///
/// Runs synthesis inline and answers once concepts are stored. A note that
/// is already processing or processed answers 409.
pub async fn process_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessingReport>, ApiError> {
    Ok(Json(state.service.process_note(id).await?))
}
