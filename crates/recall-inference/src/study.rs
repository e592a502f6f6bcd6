//! Typed study operations over a text-completion backend.
//!
//! Each operation builds its prompt, calls the backend with the study system
//! prompt, and parses the structured reply. Structured operations run inside
//! [`retry_with_backoff`] so malformed output is retried up to the policy's
//! bound before surfacing as `Error::Validation`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use recall_core::defaults::QUIZ_NAME_MAX_LENGTH;
use recall_core::{retry_with_backoff, GenerationBackend, Rating, Result, RetryPolicy};

use crate::prompts;
use crate::structured::{parse_fenced, ConceptNames, ContentBlock, GradeBlock, QuestionItem, QuestionSet};

/// Study operations bound to a backend and retry policy.
#[derive(Clone)]
pub struct StudyInference {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for StudyInference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyInference")
            .field("model", &self.backend.model_name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl StudyInference {
    pub fn new(backend: Arc<dyn GenerationBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn complete(&self, op: &str, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let response = self
            .backend
            .generate_with_system(prompts::SYSTEM_PROMPT, prompt)
            .await?;
        debug!(
            subsystem = "inference",
            component = "study",
            op,
            prompt_len = prompt.len(),
            response_len = response.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Completion returned"
        );
        Ok(response)
    }

    /// Names of the concepts a chunk covers, in extraction order.
    #[instrument(skip_all, fields(subsystem = "inference", op = "extract_concept_names"))]
    pub async fn extract_concept_names(&self, chunk: &str, known: &[String]) -> Result<Vec<String>> {
        let prompt = prompts::extract_concepts_prompt(chunk, known);
        let (this, prompt) = (self, prompt.as_str());
        retry_with_backoff(&self.retry, "extract_concept_names", || async move {
            let response = this.complete("extract_concept_names", prompt).await?;
            Ok(parse_fenced::<ConceptNames>(&response)?.into_names())
        })
        .await
    }

    /// Initial content for a concept first seen in `chunk`.
    #[instrument(skip_all, fields(subsystem = "inference", op = "synthesize_add", concept_name = name))]
    pub async fn synthesize_add(&self, chunk: &str, name: &str) -> Result<String> {
        let prompt = prompts::synthesize_add_prompt(chunk, name);
        let (this, prompt) = (self, prompt.as_str());
        retry_with_backoff(&self.retry, "synthesize_add", || async move {
            let response = this.complete("synthesize_add", prompt).await?;
            ContentBlock::parse(&response)
        })
        .await
    }

    /// The fragment `chunk` adds to an existing concept.
    #[instrument(skip_all, fields(subsystem = "inference", op = "synthesize_append", concept_name = name))]
    pub async fn synthesize_append(&self, chunk: &str, name: &str, current: &str) -> Result<String> {
        let prompt = prompts::synthesize_append_prompt(chunk, name, current);
        let (this, prompt) = (self, prompt.as_str());
        retry_with_backoff(&self.retry, "synthesize_append", || async move {
            let response = this.complete("synthesize_append", prompt).await?;
            ContentBlock::parse(&response)
        })
        .await
    }

    /// A short quiz title. Free text: only trimmed and bounded.
    #[instrument(skip_all, fields(subsystem = "inference", op = "quiz_name"))]
    pub async fn quiz_name(&self, concept_names: &[String]) -> Result<String> {
        let prompt = prompts::quiz_name_prompt(concept_names);
        let (this, prompt) = (self, prompt.as_str());
        let raw = retry_with_backoff(&self.retry, "quiz_name", || async move {
            this.complete("quiz_name", prompt).await
        })
        .await?;
        Ok(normalize_quiz_name(&raw, concept_names))
    }

    /// Exactly `count` question/answer pairs for one concept.
    #[instrument(skip_all, fields(subsystem = "inference", op = "generate_questions", concept_name = name, question_count = count))]
    pub async fn generate_questions(
        &self,
        name: &str,
        content: &str,
        count: usize,
    ) -> Result<Vec<QuestionItem>> {
        let prompt = prompts::generate_questions_prompt(name, content, count);
        let (this, prompt) = (self, prompt.as_str());
        retry_with_backoff(&self.retry, "generate_questions", || async move {
            let response = this.complete("generate_questions", prompt).await?;
            QuestionSet::parse(&response, count)
        })
        .await
    }

    /// Feedback and a rating for one learner response.
    #[instrument(skip_all, fields(subsystem = "inference", op = "grade_response"))]
    pub async fn grade_response(
        &self,
        question: &str,
        answer: &str,
        response: &str,
    ) -> Result<(String, Rating)> {
        let prompt = prompts::grade_response_prompt(question, answer, response);
        let (this, prompt) = (self, prompt.as_str());
        retry_with_backoff(&self.retry, "grade_response", || async move {
            let reply = this.complete("grade_response", prompt).await?;
            GradeBlock::parse(&reply)
        })
        .await
    }
}

/// Trim a free-text title: drop code fences and surrounding quotes, keep the
/// first non-empty line, bound its length. Falls back to the concept names.
pub fn normalize_quiz_name(raw: &str, concept_names: &[String]) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("```"))
        .unwrap_or("")
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '#' || c.is_whitespace());

    let name = if line.is_empty() {
        concept_names.join(", ")
    } else {
        line.to_string()
    };
    truncate_chars(name.trim(), QUIZ_NAME_MAX_LENGTH)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}
