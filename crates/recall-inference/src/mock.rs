//! Scripted generation backend for deterministic testing.
//!
//! Replies are served from a FIFO queue first, then from an optional
//! responder closure keyed on the prompt text. The closure form suits
//! concurrent callers whose call order is not fixed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recall_inference::mock::ScriptedBackend;
//! let backend = ScriptedBackend::new();
//! backend.push("```yaml\nconcepts: [Osmosis]\n```");
//! assert_eq!(backend.call_count(), 0);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use recall_core::{Error, GenerationBackend, Result};

type Responder = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
}

/// Generation backend that replays scripted replies.
#[derive(Clone)]
pub struct ScriptedBackend {
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    responder: Option<Responder>,
    latency_ms: u64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            responder: None,
            latency_ms: 0,
        }
    }

    /// Answer prompts the queue does not cover.
    pub fn with_responder<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(f));
        self
    }

    /// Delay every call, for exercising concurrency.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Queue a reply.
    pub fn push(&self, reply: impl Into<String>) {
        lock(&self.queue).push_back(Scripted::Reply(reply.into()));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.queue).push_back(Scripted::Fail(message.into()));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        lock(&self.queue).len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        lock(&self.calls).push(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }

        let next = lock(&self.queue).pop_front();
        match next {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(Error::Inference(message)),
            None => match &self.responder {
                Some(responder) => responder(prompt),
                None => Err(Error::Inference("scripted backend exhausted".to_string())),
            },
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_served_in_order() {
        let backend = ScriptedBackend::new();
        backend.push("one");
        backend.push("two");
        assert_eq!(backend.generate("a").await.unwrap(), "one");
        assert_eq!(backend.generate("b").await.unwrap(), "two");
        assert_eq!(backend.remaining(), 0);
        assert_eq!(backend.call_count(), 2);
        assert_eq!(backend.calls()[1].prompt, "b");
    }

    #[tokio::test]
    async fn test_exhausted_queue_is_inference_error() {
        let backend = ScriptedBackend::new();
        let err = backend.generate("a").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_push_error() {
        let backend = ScriptedBackend::new();
        backend.push_error("connection refused");
        let err = backend.generate("a").await.unwrap_err();
        assert!(matches!(err, Error::Inference(msg) if msg == "connection refused"));
    }

    #[tokio::test]
    async fn test_responder_used_after_queue() {
        let backend = ScriptedBackend::new().with_responder(|prompt| Ok(prompt.to_uppercase()));
        backend.push("queued");
        assert_eq!(backend.generate("x").await.unwrap(), "queued");
        assert_eq!(backend.generate("abc").await.unwrap(), "ABC");
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let backend = ScriptedBackend::new();
        let clone = backend.clone();
        backend.push("shared");
        assert_eq!(clone.generate("a").await.unwrap(), "shared");
        assert_eq!(backend.call_count(), 1);
        backend.clear_calls();
        assert_eq!(clone.call_count(), 0);
    }
}
