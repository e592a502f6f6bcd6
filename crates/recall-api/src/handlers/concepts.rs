//! Concept and card HTTP handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use recall_core::{Card, Concept, ConceptDetail};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListConceptsQuery {
    pub note_id: Option<Uuid>,
}

/// GET /concepts?note_id=
pub async fn list_concepts(
    State(state): State<AppState>,
    Query(query): Query<ListConceptsQuery>,
) -> Result<Json<Vec<Concept>>, ApiError> {
    Ok(Json(state.service.list_concepts(query.note_id).await?))
}

/// GET /concepts/:id
pub async fn get_concept(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConceptDetail>, ApiError> {
    Ok(Json(state.service.get_concept(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub rating: i64,
}

/// POST /concepts/:id/review
pub async fn review_concept(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<Card>, ApiError> {
    Ok(Json(state.service.review_concept(id, body.rating).await?))
}
