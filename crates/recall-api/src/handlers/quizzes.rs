//! Quiz HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use recall_core::{QuizGraded, QuizMode, QuizStarted, QuizSummary, QuizView};
use recall_study::CreateQuizRequest;

use crate::{ApiError, AppState};

fn default_mode() -> String {
    QuizMode::Mixed.as_str().to_string()
}

/// Body of POST /quizzes. The mode stays a string here so an unknown value
/// is reported as an invalid mode rather than a malformed body.
#[derive(Debug, Deserialize)]
pub struct CreateQuizBody {
    pub note_ids: Vec<Uuid>,
    pub concept_limit: usize,
    pub question_limit: usize,
    #[serde(default = "default_mode")]
    pub mode: String,
}

impl TryFrom<CreateQuizBody> for CreateQuizRequest {
    type Error = recall_core::Error;

    fn try_from(body: CreateQuizBody) -> Result<Self, Self::Error> {
        Ok(CreateQuizRequest {
            note_ids: body.note_ids,
            concept_limit: body.concept_limit,
            question_limit: body.question_limit,
            mode: body.mode.parse()?,
        })
    }
}

/// GET /quizzes
pub async fn list_quizzes(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    Ok(Json(state.service.list_quizzes().await?))
}

/// POST /quizzes
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(body): Json<CreateQuizBody>,
) -> Result<(StatusCode, Json<QuizStarted>), ApiError> {
    let started = state.service.create_quiz(body.try_into()?).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// GET /quizzes/:id
///
/// Model answers are included only once the quiz is completed.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizView>, ApiError> {
    Ok(Json(state.service.get_quiz(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub responses: Vec<String>,
}

/// POST /quizzes/:id/submit
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<QuizGraded>, ApiError> {
    Ok(Json(state.service.submit_quiz(id, body.responses).await?))
}
