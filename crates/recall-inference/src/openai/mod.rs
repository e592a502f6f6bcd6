//! OpenAI-compatible inference backend.
//!
//! Works with any endpoint speaking the chat completions protocol: the
//! OpenAI cloud API, Ollama in compatibility mode, vLLM, LocalAI, LM Studio.
//!
//! # Example
//!
//! ```rust,no_run
//! use recall_inference::openai::OpenAIBackend;
//! use recall_core::GenerationBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::from_env().unwrap();
//!     let reply = backend.generate("Define spaced repetition.").await.unwrap();
//!     println!("{}", reply);
//! }
//! ```

mod backend;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig, DEFAULT_GEN_MODEL, DEFAULT_OPENAI_URL, DEFAULT_TIMEOUT_SECS};
pub use types::*;
