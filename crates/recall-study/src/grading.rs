//! Grading: score each response, fold grades per concept, review cards.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{info, instrument};
use uuid::Uuid;

use recall_core::{
    CardLifecycle, Error, QuestionResult, QuizCompletion, QuizGraded, QuizQuestion, QuizStatus,
    Rating, Result,
};
use recall_inference::StudyInference;

use crate::store::StudyStore;

/// Floored mean of each concept's grades, in first-appearance order.
pub fn aggregate_ratings(questions: &[QuizQuestion], grades: &[Rating]) -> Vec<(Uuid, Rating)> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut sums: HashMap<Uuid, (i64, i64)> = HashMap::new();

    for (question, grade) in questions.iter().zip(grades) {
        let entry = sums.entry(question.concept_id).or_insert_with(|| {
            order.push(question.concept_id);
            (0, 0)
        });
        entry.0 += i64::from(grade.value());
        entry.1 += 1;
    }

    order
        .into_iter()
        .filter_map(|concept_id| {
            let (sum, count) = sums.get(&concept_id)?;
            // The mean of values in 1..=4 stays in 1..=4.
            Rating::try_from(sum / count).ok().map(|r| (concept_id, r))
        })
        .collect()
}

/// Grades submissions and completes quizzes.
#[derive(Clone)]
pub struct GradingPipeline {
    store: StudyStore,
    inference: StudyInference,
    lifecycle: CardLifecycle,
    concurrency: usize,
}

impl GradingPipeline {
    pub fn new(
        store: StudyStore,
        inference: StudyInference,
        lifecycle: CardLifecycle,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            inference,
            lifecycle,
            concurrency: concurrency.max(1),
        }
    }

    /// Grade `responses` against the quiz and complete it.
    ///
    /// Preconditions are checked before any grading call, and again inside
    /// the completing transaction so a concurrent submission cannot review
    /// the same cards twice. A question whose grading exhausts its retries
    /// fails the submission with nothing mutated.
    #[instrument(skip(self, responses), fields(subsystem = "study", component = "grading", op = "submit", quiz_id = %quiz_id))]
    pub async fn submit(&self, quiz_id: Uuid, responses: Vec<String>) -> Result<QuizGraded> {
        let start = Instant::now();
        let quiz = self.store.quizzes.get(quiz_id).await?;

        if quiz.status != QuizStatus::Active {
            return Err(Error::AlreadyCompleted(quiz_id));
        }
        if responses.len() != quiz.questions.len() {
            return Err(Error::ResponseCountMismatch {
                expected: quiz.questions.len(),
                actual: responses.len(),
            });
        }

        let inference = &self.inference;
        let grading: Vec<_> = quiz
            .questions
            .iter()
            .zip(&responses)
            .map(|(q, response)| inference.grade_response(&q.question, &q.answer, response))
            .collect();
        let graded: Vec<(String, Rating)> = stream::iter(grading)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let grades: Vec<Rating> = graded.iter().map(|(_, grade)| *grade).collect();
        let reviews = aggregate_ratings(&quiz.questions, &grades);
        let total_score: u32 = grades.iter().map(|g| g.value() as u32).sum();

        let results: Vec<QuestionResult> = responses
            .into_iter()
            .zip(graded)
            .map(|(response, (feedback, grade))| QuestionResult {
                response,
                grade,
                feedback,
            })
            .collect();
        let feedback = results.iter().map(|r| r.feedback.clone()).collect();

        let completion = QuizCompletion {
            results,
            reviews,
            completed_at: Utc::now(),
        };
        let reviewed = self
            .store
            .quizzes
            .complete(quiz_id, completion, &self.lifecycle)
            .await?;

        info!(
            question_count = grades.len(),
            reviewed_cards = reviewed.len(),
            total_score,
            duration_ms = start.elapsed().as_millis() as u64,
            "Quiz graded"
        );

        Ok(QuizGraded {
            quiz_id,
            grades,
            feedback,
            total_score,
        })
    }
}
