//! # recall-inference
//!
//! Text-completion backends and the structured study operations built on
//! them.
//!
//! This crate provides:
//! - Ollama implementation (default)
//! - OpenAI-compatible implementation (optional, feature `openai`)
//! - Prompt builders and fenced YAML output contracts
//! - [`StudyInference`]: concept extraction, synthesis, quiz naming,
//!   question generation and grading, each retried on malformed output
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `openai`: Enable OpenAI-compatible backend
//! - `mock`: Expose [`mock::ScriptedBackend`] to downstream tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recall_inference::{OllamaBackend, StudyInference};
//! use recall_core::RetryPolicy;
//!
//! #[tokio::main]
//! async fn main() {
//!     let study = StudyInference::new(Arc::new(OllamaBackend::from_env()), RetryPolicy::default());
//!     let names = study.extract_concept_names("Osmosis moves water...", &[]).await.unwrap();
//!     println!("{:?}", names);
//! }
//! ```

pub mod config;
pub mod prompts;
pub mod structured;
pub mod study;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{backend_from_env, InferenceBackendKind};
pub use structured::QuestionItem;
pub use study::StudyInference;

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(feature = "openai")]
pub use openai::{OpenAIBackend, OpenAIConfig};
