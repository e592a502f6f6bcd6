//! # recall-core
//!
//! Core types, traits, and abstractions for recall.
//!
//! This crate provides the domain model (notes, concepts, cards, quizzes),
//! the error taxonomy, the repository and generation traits the other crates
//! implement, the spaced-repetition scheduler with its card lifecycle, and
//! shared utilities (retry, chunking, configuration).

pub mod chunking;
pub mod config;
pub mod defaults;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod retry;
pub mod scheduling;
pub mod tokenizer;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use chunking::TextChunker;
pub use config::StudyConfig;
pub use error::{Error, Result};
pub use lifecycle::CardLifecycle;
pub use models::*;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use scheduling::{FsrsScheduler, SchedulerConfig, SchedulingPolicy};
pub use tokenizer::*;
pub use traits::*;
pub use uuid_utils::new_v7;
