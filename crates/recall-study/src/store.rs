//! Repository bundle the pipelines run against.

use std::sync::Arc;

use recall_core::{CardRepository, ConceptRepository, NoteRepository, QuizRepository};
use recall_db::Database;

/// Trait-object handles to every repository, so the same pipelines run on
/// PostgreSQL and on the in-memory store.
#[derive(Clone)]
pub struct StudyStore {
    pub notes: Arc<dyn NoteRepository>,
    pub concepts: Arc<dyn ConceptRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl StudyStore {
    pub fn from_database(db: &Database) -> Self {
        Self {
            notes: Arc::new(db.notes.clone()),
            concepts: Arc::new(db.concepts.clone()),
            cards: Arc::new(db.cards.clone()),
            quizzes: Arc::new(db.quizzes.clone()),
        }
    }
}
