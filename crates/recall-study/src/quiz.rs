//! Quiz creation: select concepts, allocate and generate questions.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use recall_core::{
    defaults, new_v7, Error, Quiz, QuizMode, QuizPrompt, QuizQuestion, QuizStarted, QuizStatus, Result,
};
use recall_inference::StudyInference;

use crate::selection::{allocate_questions, select_concepts};
use crate::store::StudyStore;

/// Parameters for a new quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuizRequest {
    pub note_ids: Vec<Uuid>,
    pub concept_limit: usize,
    pub question_limit: usize,
    pub mode: QuizMode,
}

impl CreateQuizRequest {
    pub fn validate(&self) -> Result<()> {
        if self.note_ids.is_empty() {
            return Err(Error::InvalidInput("at least one note id is required".into()));
        }
        if self.concept_limit == 0 {
            return Err(Error::InvalidInput("concept_limit must be at least 1".into()));
        }
        if self.question_limit == 0 {
            return Err(Error::InvalidInput("question_limit must be at least 1".into()));
        }
        if self.question_limit > defaults::MAX_QUESTIONS {
            return Err(Error::InvalidInput(format!(
                "question_limit must be at most {}",
                defaults::MAX_QUESTIONS
            )));
        }
        Ok(())
    }

    /// Note ids with repeats removed, first occurrence kept.
    fn distinct_note_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(self.note_ids.len());
        for id in &self.note_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Builds and stores new quizzes.
#[derive(Clone)]
pub struct QuizOrchestrator {
    store: StudyStore,
    inference: StudyInference,
}

impl QuizOrchestrator {
    pub fn new(store: StudyStore, inference: StudyInference) -> Self {
        Self { store, inference }
    }

    /// Create an active quiz. Any generation failure after retries fails
    /// the whole request and nothing is stored.
    #[instrument(skip(self, req), fields(subsystem = "study", component = "quiz", op = "create_quiz", mode = %req.mode))]
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<QuizStarted> {
        let start = Instant::now();
        req.validate()?;

        let note_ids = req.distinct_note_ids();
        for id in &note_ids {
            if !self.store.notes.exists(*id).await? {
                return Err(Error::NoteNotFound(*id));
            }
        }

        let now = Utc::now();
        let candidates = self.store.concepts.list_with_cards(&note_ids).await?;
        let candidate_count = candidates.len();
        let selected = select_concepts(candidates, req.mode, req.concept_limit, now);
        if selected.is_empty() {
            return Err(Error::InvalidInput(format!(
                "no concepts eligible for mode {} in the given notes",
                req.mode
            )));
        }
        let counts = allocate_questions(selected.len(), req.question_limit);
        debug!(
            candidate_count,
            selected = selected.len(),
            allocation = ?counts,
            "Selected quiz concepts"
        );

        let names: Vec<String> = selected.iter().map(|i| i.concept.name.clone()).collect();
        let name = self.inference.quiz_name(&names).await?;

        let mut questions = Vec::with_capacity(counts.iter().sum());
        for (item, &count) in selected.iter().zip(&counts) {
            if count == 0 {
                continue;
            }
            let generated = self
                .inference
                .generate_questions(&item.concept.name, &item.concept.content, count)
                .await?;
            questions.extend(generated.into_iter().map(|q| QuizQuestion {
                concept_id: item.concept.id,
                question: q.question,
                answer: q.answer,
            }));
        }

        let quiz = Quiz {
            id: new_v7(),
            name,
            status: QuizStatus::Active,
            questions,
            results: None,
            created_at_utc: now,
            completed_at_utc: None,
        };
        self.store.quizzes.insert(&quiz).await?;

        info!(
            quiz_id = %quiz.id,
            concept_count = selected.len(),
            question_count = quiz.questions.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Quiz created"
        );

        Ok(QuizStarted {
            quiz_id: quiz.id,
            name: quiz.name,
            questions: quiz
                .questions
                .into_iter()
                .enumerate()
                .map(|(index, q)| QuizPrompt {
                    index,
                    concept_id: q.concept_id,
                    question: q.question,
                })
                .collect(),
        })
    }
}
