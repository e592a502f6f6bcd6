//! Backend selection.
//!
//! `RECALL_INFERENCE_BACKEND` picks the generation backend (`ollama` or
//! `openai`); each backend then reads its own environment variables.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use recall_core::{Error, GenerationBackend, Result};

/// Environment variable naming the backend.
pub const ENV_INFERENCE_BACKEND: &str = "RECALL_INFERENCE_BACKEND";

/// Inference backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferenceBackendKind {
    #[default]
    Ollama,
    OpenAI,
}

impl FromStr for InferenceBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            other => Err(Error::Config(format!("unknown inference backend: {}", other))),
        }
    }
}

impl fmt::Display for InferenceBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

impl InferenceBackendKind {
    /// Read the backend kind, defaulting to Ollama when unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(ENV_INFERENCE_BACKEND) {
            Some(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }
}

/// Build the configured backend.
pub fn backend_from_env() -> Result<Arc<dyn GenerationBackend>> {
    let kind = InferenceBackendKind::from_env()?;
    let backend = build_backend(kind)?;
    info!(
        subsystem = "inference",
        component = "config",
        backend = %kind,
        model = backend.model_name(),
        "Inference backend selected"
    );
    Ok(backend)
}

fn build_backend(kind: InferenceBackendKind) -> Result<Arc<dyn GenerationBackend>> {
    match kind {
        #[cfg(feature = "ollama")]
        InferenceBackendKind::Ollama => Ok(Arc::new(crate::ollama::OllamaBackend::from_env())),
        #[cfg(feature = "openai")]
        InferenceBackendKind::OpenAI => Ok(Arc::new(crate::openai::OpenAIBackend::from_env()?)),
        #[allow(unreachable_patterns)]
        other => Err(Error::Config(format!(
            "inference backend '{}' is not compiled in",
            other
        ))),
    }
}
