//! Centralized default constants for recall.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Every value here can be overridden through the environment
//! variables read in [`crate::config`].

// =============================================================================
// SCHEDULING
// =============================================================================

/// Learning ladder applied to new cards.
pub const LEARNING_STEPS: &str = "1m,10m,30m,1d";

/// Relearning ladder applied after a lapse in Review.
pub const RELEARNING_STEPS: &str = "1m,10m,30m,1h,1d";

/// Upper bound on any scheduled Review interval, in days.
pub const MAX_INTERVAL_DAYS: i64 = 14;

/// Longest accepted step or Review interval, in days.
pub const MAX_SCHEDULE_DAYS: i64 = 36_500;

/// Target probability of recall at the due date.
pub const DESIRED_RETENTION: f64 = 0.9;

/// Whether Review intervals are randomly spread to avoid pile-ups.
pub const ENABLE_FUZZ: bool = true;

// =============================================================================
// CHUNKING
// =============================================================================

/// Token budget per note chunk fed to concept synthesis.
pub const CHUNK_TOKENS: usize = 2000;

/// Tokenizer encoding used for chunk budgets.
pub const CHUNK_ENCODING: &str = "cl100k_base";

// =============================================================================
// RETRY
// =============================================================================

/// Attempts per structured-output call, including the first.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry, in milliseconds.
pub const RETRY_DELAY_MS: u64 = 500;

/// Multiplier applied to the delay after each retry.
pub const RETRY_BACKOFF: f64 = 2.0;

/// Ceiling on a single retry delay, in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 10_000;

// =============================================================================
// QUIZZES
// =============================================================================

/// Responses graded in parallel during quiz submission.
pub const GRADING_CONCURRENCY: usize = 4;

/// Upper bound on questions requested for one quiz.
pub const MAX_QUESTIONS: usize = 200;

/// Maximum characters of a generated quiz name.
pub const QUIZ_NAME_MAX_LENGTH: usize = 80;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default Ollama generation model.
pub const GEN_MODEL: &str = "gpt-oss:20b";

/// Default OpenAI-compatible base URL.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default OpenAI-compatible generation model.
pub const OPENAI_GEN_MODEL: &str = "gpt-4o-mini";

/// Generation request timeout in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default page size for list endpoints.
pub const PAGE_LIMIT: i64 = 50;

/// Maximum accepted request body (note uploads).
pub const MAX_BODY_SIZE_BYTES: usize = 8 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults_are_sane() {
        assert!(RETRY_MAX_ATTEMPTS >= 1);
        assert!(RETRY_BACKOFF >= 1.0);
        assert!(RETRY_DELAY_MS <= RETRY_MAX_DELAY_MS);
    }

    #[test]
    fn test_retention_in_unit_interval() {
        assert!(DESIRED_RETENTION > 0.0 && DESIRED_RETENTION < 1.0);
    }
}
