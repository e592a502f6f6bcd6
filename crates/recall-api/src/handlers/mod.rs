//! HTTP handlers for recall-api, one module per resource.

pub mod concepts;
pub mod notes;
pub mod quizzes;
