//! Concept repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use recall_core::{
    Concept, ConceptDetail, ConceptRepository, ConceptWithCard, Error, Result,
};

use crate::cards::{map_row_to_card, map_row_to_review_log, CARD_COLUMNS};

const CONCEPT_COLUMNS: &str = "c.id, c.note_id, c.name, c.content, c.position, c.created_at_utc";

/// PostgreSQL implementation of ConceptRepository.
#[derive(Clone)]
pub struct PgConceptRepository {
    pool: Pool<Postgres>,
}

impl PgConceptRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_row_to_concept(row: &PgRow) -> Concept {
    Concept {
        id: row.get("id"),
        note_id: row.get("note_id"),
        name: row.get("name"),
        content: row.get("content"),
        position: row.get("position"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[async_trait]
impl ConceptRepository for PgConceptRepository {
    async fn list(&self, note_id: Option<Uuid>) -> Result<Vec<Concept>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM concepts c
             JOIN notes n ON n.id = c.note_id
             WHERE ($1::uuid IS NULL OR c.note_id = $1)
             ORDER BY n.created_at_utc DESC, c.note_id, c.position",
            CONCEPT_COLUMNS
        ))
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(map_row_to_concept).collect())
    }

    async fn list_with_cards(&self, note_ids: &[Uuid]) -> Result<Vec<ConceptWithCard>> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {}, {} FROM concepts c
             JOIN cards k ON k.concept_id = c.id
             WHERE c.note_id = ANY($1)
             ORDER BY array_position($1, c.note_id), c.position",
            CONCEPT_COLUMNS, CARD_COLUMNS
        ))
        .bind(note_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                Ok(ConceptWithCard {
                    concept: map_row_to_concept(row),
                    card: map_row_to_card(row)?,
                })
            })
            .collect()
    }

    async fn get(&self, id: Uuid) -> Result<ConceptDetail> {
        let row = sqlx::query(&format!(
            "SELECT {}, {} FROM concepts c
             JOIN cards k ON k.concept_id = c.id
             WHERE c.id = $1",
            CONCEPT_COLUMNS, CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::ConceptNotFound(id))?;

        let concept = map_row_to_concept(&row);
        let card = map_row_to_card(&row)?;

        let log_rows = sqlx::query(
            "SELECT id, card_id, rating, review_datetime, review_duration_ms
             FROM review_logs WHERE card_id = $1
             ORDER BY review_datetime, id",
        )
        .bind(card.id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let review_logs = log_rows
            .iter()
            .map(map_row_to_review_log)
            .collect::<Result<Vec<_>>>()?;

        Ok(ConceptDetail {
            concept,
            card,
            review_logs,
        })
    }
}
