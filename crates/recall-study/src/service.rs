//! Single entry point for every study operation.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use recall_core::{
    Card, CardLifecycle, Concept, ConceptDetail, CreateNoteRequest, FsrsScheduler,
    GenerationBackend, Note, NoteSummary, ProcessingReport, QuizGraded, QuizStarted, QuizSummary,
    QuizView, Rating, Result, StudyConfig, TextChunker, Tokenizer,
};
use recall_inference::StudyInference;

use crate::grading::GradingPipeline;
use crate::processing::NoteProcessor;
use crate::quiz::{CreateQuizRequest, QuizOrchestrator};
use crate::store::StudyStore;
use crate::synthesis::ConceptSynthesizer;

/// Notes, concepts and quizzes over one store and one completion backend.
#[derive(Clone)]
pub struct StudyService {
    store: StudyStore,
    inference: StudyInference,
    lifecycle: CardLifecycle,
    processor: NoteProcessor,
    orchestrator: QuizOrchestrator,
    grading: GradingPipeline,
}

impl StudyService {
    pub fn new(
        store: StudyStore,
        backend: Arc<dyn GenerationBackend>,
        tokenizer: Arc<dyn Tokenizer>,
        config: &StudyConfig,
    ) -> Self {
        let inference = StudyInference::new(backend, config.retry.clone());
        let lifecycle = CardLifecycle::new(Arc::new(FsrsScheduler::new(config.scheduler.clone())));
        let processor = NoteProcessor::new(
            store.clone(),
            ConceptSynthesizer::new(inference.clone()),
            TextChunker::new(config.chunk_tokens, tokenizer),
            lifecycle.clone(),
        );
        let orchestrator = QuizOrchestrator::new(store.clone(), inference.clone());
        let grading = GradingPipeline::new(
            store.clone(),
            inference.clone(),
            lifecycle.clone(),
            config.grading_concurrency,
        );

        Self {
            store,
            inference,
            lifecycle,
            processor,
            orchestrator,
            grading,
        }
    }

    pub fn model_name(&self) -> &str {
        self.inference.backend().model_name()
    }

    /// Whether the completion backend answers.
    pub async fn backend_healthy(&self) -> bool {
        self.inference.backend().health_check().await.unwrap_or(false)
    }

    // Notes

    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        self.store.notes.insert(req).await
    }

    pub async fn list_notes(&self) -> Result<Vec<NoteSummary>> {
        self.store.notes.list().await
    }

    pub async fn get_note(&self, id: Uuid) -> Result<Note> {
        self.store.notes.fetch(id).await
    }

    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        self.store.notes.delete(id).await
    }

    pub async fn process_note(&self, id: Uuid) -> Result<ProcessingReport> {
        self.processor.process_note(id).await
    }

    // Concepts

    pub async fn list_concepts(&self, note_id: Option<Uuid>) -> Result<Vec<Concept>> {
        self.store.concepts.list(note_id).await
    }

    pub async fn get_concept(&self, id: Uuid) -> Result<ConceptDetail> {
        self.store.concepts.get(id).await
    }

    /// Manual review with a raw rating value.
    #[instrument(skip(self), fields(subsystem = "study", op = "review_concept"))]
    pub async fn review_concept(&self, concept_id: Uuid, rating: i64) -> Result<Card> {
        let rating = Rating::try_from(rating)?;
        self.store
            .cards
            .review_concept(concept_id, rating, Utc::now(), &self.lifecycle)
            .await
    }

    // Quizzes

    pub async fn list_quizzes(&self) -> Result<Vec<QuizSummary>> {
        self.store.quizzes.list().await
    }

    pub async fn get_quiz(&self, id: Uuid) -> Result<QuizView> {
        Ok(self.store.quizzes.get(id).await?.into())
    }

    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<QuizStarted> {
        self.orchestrator.create_quiz(req).await
    }

    pub async fn submit_quiz(&self, quiz_id: Uuid, responses: Vec<String>) -> Result<QuizGraded> {
        self.grading.submit(quiz_id, responses).await
    }
}
