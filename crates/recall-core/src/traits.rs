//! Core traits for recall abstractions.
//!
//! These traits define the interfaces that storage and inference
//! implementations must satisfy, so the study pipelines can run against
//! PostgreSQL in production and an in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lifecycle::CardLifecycle;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Request for creating a new note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub name: String,
    pub content: String,
}

impl CreateNoteRequest {
    /// Name and content must both be non-blank.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("note name must not be empty".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::InvalidInput("note content must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Repository for notes and their processing status.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note in `pending` status.
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a note by ID.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// List notes, newest first.
    async fn list(&self) -> Result<Vec<NoteSummary>>;

    /// Delete a note and, by cascade, its concepts, cards, and review logs.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Check if a note exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Atomically move a note from `pending` to `processing`.
    ///
    /// Fails with `ConcurrencyRace` when the note is in any other status and
    /// `NoteNotFound` when it does not exist.
    async fn claim_for_processing(&self, id: Uuid) -> Result<Note>;

    /// Persist the synthesized concepts with their cards and mark the note
    /// `processed`, all in one transaction.
    async fn complete_processing(&self, id: Uuid, concepts: &[ConceptWithCard]) -> Result<()>;

    /// Return a note in `processing` to `pending` after a failed run.
    async fn release_processing(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// CONCEPT REPOSITORY TRAITS
// =============================================================================

/// Read access to concepts.
#[async_trait]
pub trait ConceptRepository: Send + Sync {
    /// List concepts, optionally for one note, in synthesis order.
    async fn list(&self, note_id: Option<Uuid>) -> Result<Vec<Concept>>;

    /// Concepts of the given notes joined with their cards.
    ///
    /// Ordered by the position of the note in `note_ids`, then by synthesis
    /// order within the note.
    async fn list_with_cards(&self, note_ids: &[Uuid]) -> Result<Vec<ConceptWithCard>>;

    /// A concept with its card and review history.
    async fn get(&self, id: Uuid) -> Result<ConceptDetail>;
}

// =============================================================================
// CARD REPOSITORY TRAITS
// =============================================================================

/// Serialized card mutation.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Review the card of one concept under an exclusive row lock, append
    /// the review log, and return the updated card.
    async fn review_concept(
        &self,
        concept_id: Uuid,
        rating: Rating,
        now: DateTime<Utc>,
        lifecycle: &CardLifecycle,
    ) -> Result<Card>;
}

// =============================================================================
// QUIZ REPOSITORY TRAITS
// =============================================================================

/// Everything written when a quiz is graded.
#[derive(Debug, Clone)]
pub struct QuizCompletion {
    /// One result per question, in question order.
    pub results: Vec<QuestionResult>,
    /// Aggregated rating per concept, in first-appearance order.
    pub reviews: Vec<(Uuid, Rating)>,
    pub completed_at: DateTime<Utc>,
}

/// Repository for quizzes.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist a new active quiz.
    async fn insert(&self, quiz: &Quiz) -> Result<()>;

    /// Fetch a quiz by ID.
    async fn get(&self, id: Uuid) -> Result<Quiz>;

    /// List quizzes, newest first.
    async fn list(&self) -> Result<Vec<QuizSummary>>;

    /// Grade a quiz exactly once.
    ///
    /// In one transaction: lock the quiz, fail with `AlreadyCompleted` unless
    /// it is still active, review each listed concept's card under lock,
    /// append review logs, and store the results. Concepts whose card no
    /// longer exists are skipped. Returns the updated cards.
    async fn complete(
        &self,
        id: Uuid,
        completion: QuizCompletion,
        lifecycle: &CardLifecycle,
    ) -> Result<Vec<Card>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Check if the backend is available and responding.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_note_request_validation() {
        let ok = CreateNoteRequest {
            name: "Biology".to_string(),
            content: "Osmosis moves water.".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank_name = CreateNoteRequest {
            name: "  ".to_string(),
            ..ok.clone()
        };
        assert!(matches!(blank_name.validate(), Err(Error::InvalidInput(_))));

        let blank_content = CreateNoteRequest {
            content: "\n".to_string(),
            ..ok
        };
        assert!(matches!(blank_content.validate(), Err(Error::InvalidInput(_))));
    }
}
