//! Error types for recall.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using recall's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for recall operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),

    /// Concept not found
    #[error("Concept not found: {0}")]
    ConceptNotFound(Uuid),

    /// Quiz not found
    #[error("Quiz not found: {0}")]
    QuizNotFound(Uuid),

    /// Structured output from the completion backend violated its contract
    /// after every retry was spent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown quiz selection mode
    #[error("Invalid quiz mode: {0}")]
    InvalidMode(String),

    /// Rating outside Again..=Easy
    #[error("Invalid rating: {0} (expected 1-4)")]
    InvalidRating(i64),

    /// Submitted responses do not line up with the quiz questions
    #[error("Response count mismatch: expected {expected}, got {actual}")]
    ResponseCountMismatch { expected: usize, actual: usize },

    /// Quiz was already graded
    #[error("Quiz already completed: {0}")]
    AlreadyCompleted(Uuid),

    /// A conditional state transition lost to a concurrent writer
    #[error("Concurrent modification: {0}")]
    ConcurrencyRace(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a bounded retry may succeed where this attempt failed.
    ///
    /// Malformed model output and transport failures are transient; every
    /// other variant describes a state that repeating the call cannot change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Inference(_))
    }

    /// True for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::NoteNotFound(_)
                | Error::ConceptNotFound(_)
                | Error::QuizNotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Inference(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_note_not_found() {
        let id = Uuid::nil();
        let err = Error::NoteNotFound(id);
        assert_eq!(err.to_string(), format!("Note not found: {}", id));
    }

    #[test]
    fn test_error_display_quiz_not_found() {
        let id = Uuid::new_v4();
        let err = Error::QuizNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_invalid_rating() {
        let err = Error::InvalidRating(7);
        assert_eq!(err.to_string(), "Invalid rating: 7 (expected 1-4)");
    }

    #[test]
    fn test_error_display_response_count_mismatch() {
        let err = Error::ResponseCountMismatch {
            expected: 5,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Response count mismatch: expected 5, got 3"
        );
    }

    #[test]
    fn test_error_display_invalid_mode() {
        let err = Error::InvalidMode("sometimes".to_string());
        assert_eq!(err.to_string(), "Invalid quiz mode: sometimes");
    }

    #[test]
    fn test_retryable_variants() {
        assert!(Error::Validation("missing block".into()).is_retryable());
        assert!(Error::Inference("timeout".into()).is_retryable());
        assert!(!Error::InvalidInput("bad".into()).is_retryable());
        assert!(!Error::AlreadyCompleted(Uuid::nil()).is_retryable());
        assert!(!Error::ConcurrencyRace("lost".into()).is_retryable());
    }

    #[test]
    fn test_not_found_family() {
        assert!(Error::NoteNotFound(Uuid::nil()).is_not_found());
        assert!(Error::ConceptNotFound(Uuid::nil()).is_not_found());
        assert!(Error::QuizNotFound(Uuid::nil()).is_not_found());
        assert!(Error::NotFound("card".into()).is_not_found());
        assert!(!Error::Internal("x".into()).is_not_found());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("key: [unclosed");
        assert!(yaml_err.is_err());

        let err: Error = yaml_err.unwrap_err().into();
        assert!(err.to_string().contains("Serialization error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }
}
