//! # recall-db
//!
//! PostgreSQL database layer for recall.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for notes, concepts, cards and quizzes
//! - Transactional note-processing completion and quiz grading, with
//!   card reviews applied under row locks
//!
//! ## Example
//!
//! ```rust,ignore
//! use recall_db::{CreateNoteRequest, Database, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/recall").await?;
//!
//!     let note = db.notes.insert(CreateNoteRequest {
//!         name: "Cell biology".to_string(),
//!         content: "Osmosis is the movement of water...".to_string(),
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```

pub mod cards;
pub mod concepts;
pub mod notes;
pub mod pool;
pub mod quizzes;

// Shared helpers for the integration tests in tests/.
pub mod test_fixtures;

// Re-export core types
pub use recall_core::*;

pub use cards::PgCardRepository;
pub use concepts::PgConceptRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, PoolConfig};
pub use quizzes::PgQuizRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub notes: PgNoteRepository,
    pub concepts: PgConceptRepository,
    /// Locked card reviews.
    pub cards: PgCardRepository,
    pub quizzes: PgQuizRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            concepts: PgConceptRepository::new(pool.clone()),
            cards: PgCardRepository::new(pool.clone()),
            quizzes: PgQuizRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// True when a trivial query round-trips.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
