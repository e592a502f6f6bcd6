//! Quiz repository implementation.
//!
//! Questions are stored as index-aligned parallel arrays
//! (`concept_ids`, `questions`, `answers`); results likewise
//! (`responses`, `grades`, `feedback`), NULL until completion.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use recall_core::{
    Card, CardLifecycle, Error, QuestionResult, Quiz, QuizCompletion, QuizQuestion,
    QuizRepository, QuizStatus, QuizSummary, Rating, Result,
};

use crate::cards::review_card_tx;

const QUIZ_COLUMNS: &str = "id, name, status, concept_ids, questions, answers, responses, \
     grades, feedback, created_at_utc, completed_at_utc";

/// PostgreSQL implementation of QuizRepository.
#[derive(Clone)]
pub struct PgQuizRepository {
    pool: Pool<Postgres>,
}

impl PgQuizRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn parse_status(row: &PgRow) -> Result<QuizStatus> {
    let status: String = row.get("status");
    status.parse()
}

fn map_row_to_quiz(row: &PgRow) -> Result<Quiz> {
    let concept_ids: Vec<Uuid> = row.get("concept_ids");
    let questions: Vec<String> = row.get("questions");
    let answers: Vec<String> = row.get("answers");

    let questions = concept_ids
        .into_iter()
        .zip(questions)
        .zip(answers)
        .map(|((concept_id, question), answer)| QuizQuestion {
            concept_id,
            question,
            answer,
        })
        .collect::<Vec<_>>();

    let responses: Option<Vec<String>> = row.get("responses");
    let grades: Option<Vec<i16>> = row.get("grades");
    let feedback: Option<Vec<String>> = row.get("feedback");

    let results = match (responses, grades, feedback) {
        (Some(responses), Some(grades), Some(feedback)) => Some(
            responses
                .into_iter()
                .zip(grades)
                .zip(feedback)
                .map(|((response, grade), feedback)| {
                    Ok(QuestionResult {
                        response,
                        grade: Rating::try_from(i64::from(grade))?,
                        feedback,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        _ => None,
    };

    Ok(Quiz {
        id: row.get("id"),
        name: row.get("name"),
        status: parse_status(row)?,
        questions,
        results,
        created_at_utc: row.get("created_at_utc"),
        completed_at_utc: row.get("completed_at_utc"),
    })
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    #[instrument(skip(self, quiz), fields(subsystem = "database", component = "quizzes", op = "insert", quiz_id = %quiz.id))]
    async fn insert(&self, quiz: &Quiz) -> Result<()> {
        let concept_ids: Vec<Uuid> = quiz.questions.iter().map(|q| q.concept_id).collect();
        let questions: Vec<&str> = quiz.questions.iter().map(|q| q.question.as_str()).collect();
        let answers: Vec<&str> = quiz.questions.iter().map(|q| q.answer.as_str()).collect();

        sqlx::query(
            "INSERT INTO quizzes (id, name, status, concept_ids, questions, answers, created_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(quiz.id)
        .bind(&quiz.name)
        .bind(quiz.status.as_str())
        .bind(&concept_ids)
        .bind(&questions)
        .bind(&answers)
        .bind(quiz.created_at_utc)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Quiz> {
        let row = sqlx::query(&format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::QuizNotFound(id))?;
        map_row_to_quiz(&row)
    }

    async fn list(&self) -> Result<Vec<QuizSummary>> {
        let rows = sqlx::query(
            "SELECT id, name, status, created_at_utc,
                    cardinality(questions)::BIGINT AS question_count,
                    (SELECT SUM(g)::BIGINT FROM unnest(grades) AS g) AS total_score
             FROM quizzes
             ORDER BY created_at_utc DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                Ok(QuizSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    status: parse_status(row)?,
                    question_count: row.get("question_count"),
                    total_score: row.get("total_score"),
                    created_at_utc: row.get("created_at_utc"),
                })
            })
            .collect()
    }

    #[instrument(skip(self, completion, lifecycle), fields(subsystem = "database", component = "quizzes", op = "complete", quiz_id = %id))]
    async fn complete(
        &self,
        id: Uuid,
        completion: QuizCompletion,
        lifecycle: &CardLifecycle,
    ) -> Result<Vec<Card>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Locking the quiz row serializes concurrent submissions of the same
        // quiz; the loser observes `completed` below.
        let row = sqlx::query(
            "SELECT status, cardinality(questions) AS question_count
             FROM quizzes WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::QuizNotFound(id))?;

        if parse_status(&row)? != QuizStatus::Active {
            return Err(Error::AlreadyCompleted(id));
        }
        let question_count: i32 = row.get("question_count");
        if completion.results.len() != question_count as usize {
            return Err(Error::ResponseCountMismatch {
                expected: question_count as usize,
                actual: completion.results.len(),
            });
        }

        // Card locks are taken in concept-id order so overlapping quizzes
        // cannot deadlock.
        let mut reviews = completion.reviews.clone();
        reviews.sort_by_key(|(concept_id, _)| *concept_id);

        let mut updated = Vec::with_capacity(reviews.len());
        for (concept_id, rating) in reviews {
            match review_card_tx(&mut tx, concept_id, rating, completion.completed_at, lifecycle)
                .await?
            {
                Some(card) => updated.push(card),
                None => warn!(
                    concept_id = %concept_id,
                    "Graded concept no longer has a card, skipping review"
                ),
            }
        }

        let responses: Vec<&str> = completion.results.iter().map(|r| r.response.as_str()).collect();
        let grades: Vec<i16> = completion.results.iter().map(|r| r.grade.value()).collect();
        let feedback: Vec<&str> = completion.results.iter().map(|r| r.feedback.as_str()).collect();

        sqlx::query(
            "UPDATE quizzes
             SET status = 'completed', responses = $2, grades = $3, feedback = $4,
                 completed_at_utc = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(&responses)
        .bind(&grades)
        .bind(&feedback)
        .bind(completion.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        info!(
            reviewed_cards = updated.len(),
            question_count = grades.len(),
            "Quiz completed"
        );
        Ok(updated)
    }
}
