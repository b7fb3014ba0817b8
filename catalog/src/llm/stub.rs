//! Deterministic text generator for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionError, TextGenerator};

type Script = dyn Fn(usize, &str) -> Result<String, CompletionError> + Send + Sync;

/// Answers each prompt through a closure receiving the zero-based call index.
pub struct ScriptedGenerator {
    script: Box<Script>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &str) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the given texts in order, repeating the last one.
    pub fn replies(replies: Vec<&'static str>) -> Self {
        Self::new(move |call, _| {
            let idx = call.min(replies.len().saturating_sub(1));
            Ok(replies.get(idx).copied().unwrap_or_default().to_string())
        })
    }

    /// Every call fails with a transport error.
    pub fn failing() -> Self {
        Self::new(|_, _| Err(CompletionError::Transport("connection refused".to_string())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.script)(call, prompt)
    }
}
