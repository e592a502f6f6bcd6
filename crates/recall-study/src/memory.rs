//! In-memory repositories.
//!
//! One mutex guards the whole state, so every trait method is atomic with
//! the same observable semantics as the PostgreSQL transactions: claims are
//! compare-and-set, processing completion is all-or-nothing, and quiz
//! completion checks status, reviews cards and stores results in one step.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use recall_core::{
    new_v7, Card, CardLifecycle, CardRepository, Concept, ConceptDetail, ConceptRepository,
    ConceptWithCard, CreateNoteRequest, Error, Note, NoteRepository, NoteStatus, NoteSummary,
    Quiz, QuizCompletion, QuizRepository, QuizStatus, QuizSummary, Rating, Result, ReviewLog,
};

use crate::store::StudyStore;

#[derive(Default)]
struct State {
    notes: Vec<Note>,
    concepts: Vec<Concept>,
    cards: Vec<Card>,
    logs: Vec<ReviewLog>,
    quizzes: Vec<Quiz>,
}

impl State {
    fn note_mut(&mut self, id: Uuid) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NoteNotFound(id))
    }

    fn review(
        &mut self,
        concept_id: Uuid,
        rating: Rating,
        now: DateTime<Utc>,
        lifecycle: &CardLifecycle,
    ) -> Result<Option<Card>> {
        let Some(slot) = self.cards.iter_mut().find(|c| c.concept_id == concept_id) else {
            return Ok(None);
        };
        let (next, log) = lifecycle.review(slot, rating, now, None)?;
        *slot = next.clone();
        self.logs.push(log);
        Ok(Some(next))
    }
}

/// Repository implementations over shared in-process state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bundle this store as every repository.
    pub fn study_store(self: &Arc<Self>) -> StudyStore {
        StudyStore {
            notes: self.clone(),
            concepts: self.clone(),
            cards: self.clone(),
            quizzes: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of review logs for a concept's card.
    pub fn review_count(&self, concept_id: Uuid) -> usize {
        let state = self.lock();
        let Some(card) = state.cards.iter().find(|c| c.concept_id == concept_id) else {
            return 0;
        };
        state.logs.iter().filter(|l| l.card_id == card.id).count()
    }

    /// Overwrite a stored card, for arranging selection scenarios.
    pub fn put_card(&self, card: Card) {
        let mut state = self.lock();
        match state.cards.iter_mut().find(|c| c.concept_id == card.concept_id) {
            Some(slot) => *slot = card,
            None => state.cards.push(card),
        }
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        req.validate()?;
        let now = Utc::now();
        let note = Note {
            id: new_v7(),
            name: req.name.trim().to_string(),
            content: req.content,
            status: NoteStatus::Pending,
            created_at_utc: now,
            updated_at_utc: now,
        };
        self.lock().notes.push(note.clone());
        Ok(note)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        self.lock()
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    async fn list(&self) -> Result<Vec<NoteSummary>> {
        let state = self.lock();
        Ok(state
            .notes
            .iter()
            .rev()
            .map(|n| NoteSummary {
                id: n.id,
                name: n.name.clone(),
                status: n.status,
                concept_count: state.concepts.iter().filter(|c| c.note_id == n.id).count() as i64,
                created_at_utc: n.created_at_utc,
            })
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        let before = state.notes.len();
        state.notes.retain(|n| n.id != id);
        if state.notes.len() == before {
            return Err(Error::NoteNotFound(id));
        }
        let (gone, kept): (Vec<Concept>, Vec<Concept>) =
            std::mem::take(&mut state.concepts).into_iter().partition(|c| c.note_id == id);
        state.concepts = kept;
        let gone_cards: Vec<Uuid> = state
            .cards
            .iter()
            .filter(|card| gone.iter().any(|c| c.id == card.concept_id))
            .map(|card| card.id)
            .collect();
        state.cards.retain(|card| !gone_cards.contains(&card.id));
        state.logs.retain(|log| !gone_cards.contains(&log.card_id));
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock().notes.iter().any(|n| n.id == id))
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<Note> {
        let mut state = self.lock();
        let note = state.note_mut(id)?;
        if note.status != NoteStatus::Pending {
            return Err(Error::ConcurrencyRace(format!("note {} is not pending", id)));
        }
        note.status = NoteStatus::Processing;
        note.updated_at_utc = Utc::now();
        Ok(note.clone())
    }

    async fn complete_processing(&self, id: Uuid, concepts: &[ConceptWithCard]) -> Result<()> {
        let mut state = self.lock();
        let note = state.note_mut(id)?;
        if note.status != NoteStatus::Processing {
            return Err(Error::ConcurrencyRace(format!(
                "note {} left processing before completion",
                id
            )));
        }
        note.status = NoteStatus::Processed;
        note.updated_at_utc = Utc::now();
        for item in concepts {
            state.concepts.push(item.concept.clone());
            state.cards.push(item.card.clone());
        }
        Ok(())
    }

    async fn release_processing(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        if let Ok(note) = state.note_mut(id) {
            if note.status == NoteStatus::Processing {
                note.status = NoteStatus::Pending;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ConceptRepository for MemoryStore {
    async fn list(&self, note_id: Option<Uuid>) -> Result<Vec<Concept>> {
        let state = self.lock();
        let mut out = Vec::new();
        for note in state.notes.iter().rev() {
            if note_id.is_some_and(|id| id != note.id) {
                continue;
            }
            let mut concepts: Vec<Concept> = state
                .concepts
                .iter()
                .filter(|c| c.note_id == note.id)
                .cloned()
                .collect();
            concepts.sort_by_key(|c| c.position);
            out.extend(concepts);
        }
        Ok(out)
    }

    async fn list_with_cards(&self, note_ids: &[Uuid]) -> Result<Vec<ConceptWithCard>> {
        let state = self.lock();
        let mut out = Vec::new();
        for note_id in note_ids {
            let mut concepts: Vec<&Concept> =
                state.concepts.iter().filter(|c| c.note_id == *note_id).collect();
            concepts.sort_by_key(|c| c.position);
            for concept in concepts {
                if let Some(card) = state.cards.iter().find(|k| k.concept_id == concept.id) {
                    out.push(ConceptWithCard {
                        concept: concept.clone(),
                        card: card.clone(),
                    });
                }
            }
        }
        Ok(out)
    }

    async fn get(&self, id: Uuid) -> Result<ConceptDetail> {
        let state = self.lock();
        let concept = state
            .concepts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(Error::ConceptNotFound(id))?;
        let card = state
            .cards
            .iter()
            .find(|k| k.concept_id == id)
            .cloned()
            .ok_or(Error::ConceptNotFound(id))?;
        let review_logs = state
            .logs
            .iter()
            .filter(|l| l.card_id == card.id)
            .cloned()
            .collect();
        Ok(ConceptDetail {
            concept,
            card,
            review_logs,
        })
    }
}

#[async_trait]
impl CardRepository for MemoryStore {
    async fn review_concept(
        &self,
        concept_id: Uuid,
        rating: Rating,
        now: DateTime<Utc>,
        lifecycle: &CardLifecycle,
    ) -> Result<Card> {
        self.lock()
            .review(concept_id, rating, now, lifecycle)?
            .ok_or(Error::ConceptNotFound(concept_id))
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn insert(&self, quiz: &Quiz) -> Result<()> {
        self.lock().quizzes.push(quiz.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Quiz> {
        self.lock()
            .quizzes
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or(Error::QuizNotFound(id))
    }

    async fn list(&self) -> Result<Vec<QuizSummary>> {
        Ok(self
            .lock()
            .quizzes
            .iter()
            .rev()
            .map(|q| QuizSummary {
                id: q.id,
                name: q.name.clone(),
                status: q.status,
                question_count: q.questions.len() as i64,
                total_score: q
                    .results
                    .as_ref()
                    .map(|r| r.iter().map(|x| i64::from(x.grade.value())).sum()),
                created_at_utc: q.created_at_utc,
            })
            .collect())
    }

    async fn complete(
        &self,
        id: Uuid,
        completion: QuizCompletion,
        lifecycle: &CardLifecycle,
    ) -> Result<Vec<Card>> {
        let mut state = self.lock();
        let quiz = state
            .quizzes
            .iter()
            .find(|q| q.id == id)
            .ok_or(Error::QuizNotFound(id))?;
        if quiz.status != QuizStatus::Active {
            return Err(Error::AlreadyCompleted(id));
        }
        if quiz.questions.len() != completion.results.len() {
            return Err(Error::ResponseCountMismatch {
                expected: quiz.questions.len(),
                actual: completion.results.len(),
            });
        }

        // Validate every review before applying any, so a failure leaves
        // the state untouched like a rolled-back transaction.
        let mut staged = Vec::new();
        for (concept_id, rating) in &completion.reviews {
            if let Some(card) = state.cards.iter().find(|c| c.concept_id == *concept_id) {
                staged.push(lifecycle.review(card, *rating, completion.completed_at, None)?);
            }
        }

        let mut updated = Vec::with_capacity(staged.len());
        for (card, log) in staged {
            if let Some(slot) = state.cards.iter_mut().find(|c| c.id == card.id) {
                *slot = card.clone();
            }
            state.logs.push(log);
            updated.push(card);
        }

        if let Some(quiz) = state.quizzes.iter_mut().find(|q| q.id == id) {
            quiz.status = QuizStatus::Completed;
            quiz.results = Some(completion.results);
            quiz.completed_at_utc = Some(completion.completed_at);
        }
        Ok(updated)
    }
}
