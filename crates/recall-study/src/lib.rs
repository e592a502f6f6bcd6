//! # recall-study
//!
//! The study pipelines of recall:
//! - [`ConceptSynthesizer`] folds note chunks into named concepts
//! - [`NoteProcessor`] claims a note, synthesizes it and stores concepts with
//!   fresh cards in one step
//! - [`QuizOrchestrator`] selects concepts and generates questions
//! - [`GradingPipeline`] grades responses and reviews the cards
//!
//! [`StudyService`] wires them together over a [`StudyStore`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use recall_study::{StudyService, StudyStore};
//! use recall_core::{StudyConfig, TiktokenTokenizer};
//!
//! let db = recall_db::Database::connect("postgres://...").await?;
//! let service = StudyService::new(
//!     StudyStore::from_database(&db),
//!     recall_inference::backend_from_env()?,
//!     Arc::new(TiktokenTokenizer::cl100k()?),
//!     &StudyConfig::from_env()?,
//! );
//! let report = service.process_note(note_id).await?;
//! ```

pub mod grading;
pub mod processing;
pub mod quiz;
pub mod selection;
pub mod service;
pub mod store;
pub mod synthesis;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

#[cfg(test)]
mod testing;

pub use grading::{aggregate_ratings, GradingPipeline};
pub use processing::NoteProcessor;
pub use quiz::{CreateQuizRequest, QuizOrchestrator};
pub use service::StudyService;
pub use store::StudyStore;
pub use synthesis::{ConceptAction, ConceptMap, ConceptSynthesizer, SynthesisOutcome, UnitFailure};

#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
