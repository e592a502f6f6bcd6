//! Structured logging schema and field name constants for recall.
//!
//! All crates use these field names for consistent structured logging so
//! log aggregation can query by the same keys across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue: retry, skipped unit, missing card |
//! | INFO  | Lifecycle events, note processed, quiz created or graded |
//! | DEBUG | Decision points, selection sizes, per-call timings |
//! | TRACE | Per-item iteration (chunks, concept actions) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "inference", "study", "scheduling"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "synthesis", "quiz", "grading", "ollama", "retry"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process_note", "create_quiz", "submit_quiz", "review"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Concept UUID being operated on.
pub const CONCEPT_ID: &str = "concept_id";

/// Card UUID being operated on.
pub const CARD_ID: &str = "card_id";

/// Quiz UUID being operated on.
pub const QUIZ_ID: &str = "quiz_id";

/// Concept name.
pub const CONCEPT_NAME: &str = "concept_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of chunks a note was split into.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of concepts produced or selected.
pub const CONCEPT_COUNT: &str = "concept_count";

/// Number of questions generated or graded.
pub const QUESTION_COUNT: &str = "question_count";

/// Synthesis units (add/append) that exhausted their retries.
pub const FAILED_UNITS: &str = "failed_units";

/// Cards reviewed by one quiz completion.
pub const REVIEWED_CARDS: &str = "reviewed_cards";

/// Raw sum of a quiz's per-question grades.
pub const TOTAL_SCORE: &str = "total_score";

/// Retry attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Scheduling fields ─────────────────────────────────────────────────────

/// Review rating (1-4).
pub const RATING: &str = "rating";

/// Card state after a review.
pub const CARD_STATE: &str = "card_state";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
