//! Core data models for recall.
//!
//! These types are shared across all recall crates and represent the core
//! domain entities: notes, the concepts synthesized from them, the
//! spaced-repetition card owned by each concept, review history, and quizzes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Processing status of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Pending,
    Processing,
    Processed,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Pending => "pending",
            NoteStatus::Processing => "processing",
            NoteStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NoteStatus::Pending),
            "processing" => Ok(NoteStatus::Processing),
            "processed" => Ok(NoteStatus::Processed),
            _ => Err(Error::Serialization(format!("unknown note status: {}", s))),
        }
    }
}

/// A study note as uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub status: NoteStatus,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Listing view of a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: Uuid,
    pub name: String,
    pub status: NoteStatus,
    pub concept_count: i64,
    pub created_at_utc: DateTime<Utc>,
}

// =============================================================================
// CONCEPT TYPES
// =============================================================================

/// An atomic learning outcome synthesized from a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: Uuid,
    pub note_id: Uuid,
    pub name: String,
    pub content: String,
    /// Order in which synthesis first produced this concept.
    pub position: i32,
    pub created_at_utc: DateTime<Utc>,
}

/// A concept joined with its card, as read for quiz selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptWithCard {
    pub concept: Concept,
    pub card: Card,
}

/// A concept with its card and review history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptDetail {
    pub concept: Concept,
    pub card: Card,
    pub review_logs: Vec<ReviewLog>,
}

// =============================================================================
// CARD TYPES
// =============================================================================

/// Scheduling state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// Never reviewed.
    New,
    /// Walking the learning ladder.
    Learning,
    /// Graduated; scheduled from stability.
    Review,
    /// Lapsed from Review; walking the relearning ladder.
    Relearning,
}

impl CardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(CardState::New),
            "learning" => Ok(CardState::Learning),
            "review" => Ok(CardState::Review),
            "relearning" => Ok(CardState::Relearning),
            _ => Err(Error::Serialization(format!("unknown card state: {}", s))),
        }
    }
}

/// Spaced-repetition state for one concept.
///
/// `last_review` is `None` exactly when `state` is [`CardState::New`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub concept_id: Uuid,
    pub state: CardState,
    /// Index into the active step ladder; `None` once graduated to Review.
    pub step: Option<i32>,
    pub stability: Option<f64>,
    pub difficulty: Option<f64>,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// Whether the card has been reviewed and its due date has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last_review.is_some() && self.due <= now
    }

    /// Selection priority key: lower stability is reviewed first and an
    /// unset stability counts as zero.
    pub fn priority_stability(&self) -> f64 {
        self.stability.unwrap_or(0.0)
    }
}

/// Recall rating given to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i64")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn value(self) -> i16 {
        self as i16
    }
}

impl TryFrom<i64> for Rating {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(Error::InvalidRating(other)),
        }
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

/// One applied review. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
    pub id: Uuid,
    pub card_id: Uuid,
    pub rating: Rating,
    pub review_datetime: DateTime<Utc>,
    pub review_duration_ms: Option<i64>,
}

// =============================================================================
// QUIZ TYPES
// =============================================================================

/// Quiz status. A quiz is graded exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Active,
    Completed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Active => "active",
            QuizStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(QuizStatus::Active),
            "completed" => Ok(QuizStatus::Completed),
            _ => Err(Error::Serialization(format!("unknown quiz status: {}", s))),
        }
    }
}

/// Which concepts are eligible for a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    /// Reviewed before and due now.
    DueOnly,
    /// Reviewed at least once.
    LearningOnly,
    /// Never reviewed.
    NewOnly,
    /// Everything.
    Mixed,
}

impl QuizMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizMode::DueOnly => "due_only",
            QuizMode::LearningOnly => "learning_only",
            QuizMode::NewOnly => "new_only",
            QuizMode::Mixed => "mixed",
        }
    }

    /// Whether a card is eligible under this mode at `now`.
    pub fn admits(&self, card: &Card, now: DateTime<Utc>) -> bool {
        match self {
            QuizMode::DueOnly => card.is_due(now),
            QuizMode::LearningOnly => card.last_review.is_some(),
            QuizMode::NewOnly => card.last_review.is_none(),
            QuizMode::Mixed => true,
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "due_only" => Ok(QuizMode::DueOnly),
            "learning_only" => Ok(QuizMode::LearningOnly),
            "new_only" => Ok(QuizMode::NewOnly),
            "mixed" => Ok(QuizMode::Mixed),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// A generated question bound to the concept it exercises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub concept_id: Uuid,
    pub question: String,
    pub answer: String,
}

/// Grading outcome for one question, index-aligned with the questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub response: String,
    pub grade: Rating,
    pub feedback: String,
}

/// A quiz. `results` is `None` while active and holds one entry per
/// question once completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub name: String,
    pub status: QuizStatus,
    pub questions: Vec<QuizQuestion>,
    pub results: Option<Vec<QuestionResult>>,
    pub created_at_utc: DateTime<Utc>,
    pub completed_at_utc: Option<DateTime<Utc>>,
}

/// Listing view of a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: Uuid,
    pub name: String,
    pub status: QuizStatus,
    pub question_count: i64,
    pub total_score: Option<i64>,
    pub created_at_utc: DateTime<Utc>,
}

/// A question as shown to the learner: the model answer is withheld.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizPrompt {
    pub index: usize,
    pub concept_id: Uuid,
    pub question: String,
}

/// Result of creating a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStarted {
    pub quiz_id: Uuid,
    pub name: String,
    pub questions: Vec<QuizPrompt>,
}

/// Result of grading a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizGraded {
    pub quiz_id: Uuid,
    pub grades: Vec<Rating>,
    pub feedback: Vec<String>,
    /// Raw sum of per-question grades.
    pub total_score: u32,
}

/// One question as shown when reading a quiz back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestionView {
    pub index: usize,
    pub concept_id: Uuid,
    pub question: String,
    /// Withheld while the quiz is active.
    pub answer: Option<String>,
    pub response: Option<String>,
    pub grade: Option<Rating>,
    pub feedback: Option<String>,
}

/// Read view of a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizView {
    pub id: Uuid,
    pub name: String,
    pub status: QuizStatus,
    pub questions: Vec<QuizQuestionView>,
    pub total_score: Option<u32>,
    pub created_at_utc: DateTime<Utc>,
    pub completed_at_utc: Option<DateTime<Utc>>,
}

impl From<Quiz> for QuizView {
    fn from(quiz: Quiz) -> Self {
        let completed = quiz.status == QuizStatus::Completed;
        let results = quiz.results.unwrap_or_default();
        let total_score = completed.then(|| results.iter().map(|r| r.grade.value() as u32).sum());

        let questions = quiz
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, q)| {
                let result = results.get(index);
                QuizQuestionView {
                    index,
                    concept_id: q.concept_id,
                    question: q.question,
                    answer: completed.then_some(q.answer),
                    response: result.map(|r| r.response.clone()),
                    grade: result.map(|r| r.grade),
                    feedback: result.map(|r| r.feedback.clone()),
                }
            })
            .collect();

        Self {
            id: quiz.id,
            name: quiz.name,
            status: quiz.status,
            questions,
            total_score,
            created_at_utc: quiz.created_at_utc,
            completed_at_utc: quiz.completed_at_utc,
        }
    }
}

// =============================================================================
// PROCESSING TYPES
// =============================================================================

/// Outcome of processing a note into concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub note_id: Uuid,
    pub concept_count: usize,
    pub chunk_count: usize,
    /// Add/Append units that exhausted their retries.
    pub failed_units: usize,
}
