//! Card repository: locked review application.
//!
//! Every card mutation goes through [`review_card_tx`], which holds a
//! `FOR UPDATE` lock on the card row for the rest of the enclosing
//! transaction. Two submissions touching the same concept therefore apply
//! their reviews one after the other instead of overwriting each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use recall_core::{
    Card, CardLifecycle, CardRepository, Error, Rating, Result, ReviewLog,
};

/// Card columns aliased so they never collide with concept columns in joins.
pub(crate) const CARD_COLUMNS: &str = "k.id AS card_id, k.concept_id AS card_concept_id, \
     k.state AS card_state, k.step AS card_step, k.stability AS card_stability, \
     k.difficulty AS card_difficulty, k.due AS card_due, k.last_review AS card_last_review";

/// PostgreSQL implementation of CardRepository.
#[derive(Clone)]
pub struct PgCardRepository {
    pool: Pool<Postgres>,
}

impl PgCardRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_row_to_card(row: &PgRow) -> Result<Card> {
    let state: String = row.get("card_state");
    Ok(Card {
        id: row.get("card_id"),
        concept_id: row.get("card_concept_id"),
        state: state.parse()?,
        step: row.get("card_step"),
        stability: row.get("card_stability"),
        difficulty: row.get("card_difficulty"),
        due: row.get("card_due"),
        last_review: row.get("card_last_review"),
    })
}

pub(crate) fn map_row_to_review_log(row: &PgRow) -> Result<ReviewLog> {
    let rating: i16 = row.get("rating");
    Ok(ReviewLog {
        id: row.get("id"),
        card_id: row.get("card_id"),
        rating: Rating::try_from(i64::from(rating))?,
        review_datetime: row.get("review_datetime"),
        review_duration_ms: row.get("review_duration_ms"),
    })
}

/// Insert a freshly created card within an existing transaction.
pub(crate) async fn insert_card_tx(tx: &mut Transaction<'_, Postgres>, card: &Card) -> Result<()> {
    sqlx::query(
        "INSERT INTO cards (id, concept_id, state, step, stability, difficulty, due, last_review)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(card.id)
    .bind(card.concept_id)
    .bind(card.state.as_str())
    .bind(card.step)
    .bind(card.stability)
    .bind(card.difficulty)
    .bind(card.due)
    .bind(card.last_review)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

/// Lock the card of `concept_id`, apply one review, persist the card and
/// its log. Returns `None` when the concept has no card.
pub(crate) async fn review_card_tx(
    tx: &mut Transaction<'_, Postgres>,
    concept_id: Uuid,
    rating: Rating,
    now: DateTime<Utc>,
    lifecycle: &CardLifecycle,
) -> Result<Option<Card>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM cards k WHERE k.concept_id = $1 FOR UPDATE",
        CARD_COLUMNS
    ))
    .bind(concept_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Error::Database)?;

    let Some(row) = row else {
        return Ok(None);
    };
    let card = map_row_to_card(&row)?;
    let (next, log) = lifecycle.review(&card, rating, now, None)?;

    sqlx::query(
        "UPDATE cards
         SET state = $2, step = $3, stability = $4, difficulty = $5, due = $6, last_review = $7
         WHERE id = $1",
    )
    .bind(next.id)
    .bind(next.state.as_str())
    .bind(next.step)
    .bind(next.stability)
    .bind(next.difficulty)
    .bind(next.due)
    .bind(next.last_review)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    sqlx::query(
        "INSERT INTO review_logs (id, card_id, rating, review_datetime, review_duration_ms)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(log.id)
    .bind(log.card_id)
    .bind(log.rating.value())
    .bind(log.review_datetime)
    .bind(log.review_duration_ms)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;

    debug!(
        subsystem = "database",
        component = "cards",
        concept_id = %concept_id,
        card_id = %next.id,
        rating = rating.value(),
        card_state = %next.state,
        "Card reviewed"
    );
    Ok(Some(next))
}

#[async_trait]
impl CardRepository for PgCardRepository {
    #[instrument(skip(self, lifecycle), fields(subsystem = "database", component = "cards", op = "review_concept"))]
    async fn review_concept(
        &self,
        concept_id: Uuid,
        rating: Rating,
        now: DateTime<Utc>,
        lifecycle: &CardLifecycle,
    ) -> Result<Card> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let card = review_card_tx(&mut tx, concept_id, rating, now, lifecycle)
            .await?
            .ok_or(Error::ConceptNotFound(concept_id))?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(card)
    }
}
