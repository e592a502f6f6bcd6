//! Fixtures for database integration tests.
//!
//! Integration tests need a live PostgreSQL. [`TestDatabase::connect`]
//! returns `None` when `DATABASE_URL` is unset so the suite skips cleanly on
//! machines without one.
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_something() {
//!     let Some(test_db) = TestDatabase::connect().await else { return };
//!     let note = test_db.note_with_concepts(&["Osmosis"]).await;
//!     // ...
//! }
//! ```

use chrono::Utc;
use uuid::Uuid;

use recall_core::{
    new_v7, CardLifecycle, Concept, ConceptWithCard, CreateNoteRequest, Note, NoteRepository,
};

use crate::{Database, PoolConfig};

/// Connected test database with migrations applied.
pub struct TestDatabase {
    pub db: Database,
}

impl TestDatabase {
    /// Connect to `DATABASE_URL`, or `None` when it is not set.
    pub async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        };
        let db = Database::connect_with_config(&url, PoolConfig::default().max_connections(5))
            .await
            .expect("Failed to connect to test database");
        #[cfg(feature = "migrations")]
        db.migrate().await.expect("Failed to run migrations");
        Some(Self { db })
    }

    /// A pending note with a unique name.
    pub async fn pending_note(&self) -> Note {
        self.db
            .notes
            .insert(CreateNoteRequest {
                name: format!("test-note-{}", Uuid::new_v4()),
                content: "Osmosis moves water across a membrane.".to_string(),
            })
            .await
            .expect("Failed to create note")
    }

    /// A processed note owning one concept (with a New card) per name.
    pub async fn note_with_concepts(&self, names: &[&str]) -> (Note, Vec<ConceptWithCard>) {
        let note = self.pending_note().await;
        self.db
            .notes
            .claim_for_processing(note.id)
            .await
            .expect("Failed to claim note");

        let lifecycle = CardLifecycle::default();
        let now = Utc::now();
        let concepts: Vec<ConceptWithCard> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let concept = Concept {
                    id: new_v7(),
                    note_id: note.id,
                    name: name.to_string(),
                    content: format!("About {}.", name),
                    position: i as i32,
                    created_at_utc: now,
                };
                let card = lifecycle.create(concept.id, now);
                ConceptWithCard { concept, card }
            })
            .collect();

        self.db
            .notes
            .complete_processing(note.id, &concepts)
            .await
            .expect("Failed to complete processing");
        (note, concepts)
    }
}
