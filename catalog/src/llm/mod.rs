//! Text completion: the single seam to the external LLM service.

pub mod client;
#[cfg(test)]
pub mod stub;

use async_trait::async_trait;

pub use client::ChatCompletionClient;

/// Failure of one completion request.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("missing LLM_API_KEY")]
    MissingCredential,
    #[error("LLM HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("LLM request timed out (timeout={secs}s)")]
    Timeout { secs: u64 },
    #[error("LLM request failed: {0}")]
    Transport(String),
    #[error("LLM response could not be read: {0}")]
    InvalidResponse(String),
}

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError>;
}
