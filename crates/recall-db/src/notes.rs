//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use recall_core::{
    new_v7, ConceptWithCard, CreateNoteRequest, Error, Note, NoteRepository, NoteStatus,
    NoteSummary, Result,
};

use crate::cards::insert_card_tx;

const NOTE_COLUMNS: &str = "id, name, content, status, created_at_utc, updated_at_utc";

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert one concept within an existing transaction.
    async fn insert_concept_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: &ConceptWithCard,
    ) -> Result<()> {
        let concept = &item.concept;
        sqlx::query(
            "INSERT INTO concepts (id, note_id, name, content, position, created_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(concept.id)
        .bind(concept.note_id)
        .bind(&concept.name)
        .bind(&concept.content)
        .bind(concept.position)
        .bind(concept.created_at_utc)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        insert_card_tx(tx, &item.card).await
    }
}

fn map_row_to_note(row: &PgRow) -> Result<Note> {
    let status: String = row.get("status");
    Ok(Note {
        id: row.get("id"),
        name: row.get("name"),
        content: row.get("content"),
        status: status.parse()?,
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    #[instrument(skip(self, req), fields(subsystem = "database", component = "notes", op = "insert"))]
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        req.validate()?;
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO notes (id, name, content, status, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {}",
            NOTE_COLUMNS
        ))
        .bind(new_v7())
        .bind(req.name.trim())
        .bind(&req.content)
        .bind(NoteStatus::Pending.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let note = map_row_to_note(&row)?;
        info!(note_id = %note.id, "Note created");
        Ok(note)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let row = sqlx::query(&format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::NoteNotFound(id))?;
        map_row_to_note(&row)
    }

    async fn list(&self) -> Result<Vec<NoteSummary>> {
        let rows = sqlx::query(
            "SELECT n.id, n.name, n.status, n.created_at_utc,
                    (SELECT COUNT(*) FROM concepts c WHERE c.note_id = n.id) AS concept_count
             FROM notes n
             ORDER BY n.created_at_utc DESC, n.id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let status: String = row.get("status");
                Ok(NoteSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    status: status.parse()?,
                    concept_count: row.get("concept_count"),
                    created_at_utc: row.get("created_at_utc"),
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(subsystem = "database", component = "notes", op = "delete"))]
    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        info!(note_id = %id, "Note deleted");
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM notes WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn claim_for_processing(&self, id: Uuid) -> Result<Note> {
        // The status predicate makes the transition a compare-and-set: of two
        // concurrent claims exactly one sees a returned row.
        let row = sqlx::query(&format!(
            "UPDATE notes SET status = 'processing', updated_at_utc = $2
             WHERE id = $1 AND status = 'pending'
             RETURNING {}",
            NOTE_COLUMNS
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => map_row_to_note(&row),
            None if self.exists(id).await? => Err(Error::ConcurrencyRace(format!(
                "note {} is not pending",
                id
            ))),
            None => Err(Error::NoteNotFound(id)),
        }
    }

    #[instrument(skip(self, concepts), fields(subsystem = "database", component = "notes", op = "complete_processing", concept_count = concepts.len()))]
    async fn complete_processing(&self, id: Uuid, concepts: &[ConceptWithCard]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        for item in concepts {
            self.insert_concept_tx(&mut tx, item).await?;
        }

        let result = sqlx::query(
            "UPDATE notes SET status = 'processed', updated_at_utc = $2
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the concept inserts.
            return Err(Error::ConcurrencyRace(format!(
                "note {} left processing before completion",
                id
            )));
        }

        tx.commit().await.map_err(Error::Database)?;
        debug!(note_id = %id, "Note processing committed");
        Ok(())
    }

    async fn release_processing(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE notes SET status = 'pending', updated_at_utc = $2
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}
