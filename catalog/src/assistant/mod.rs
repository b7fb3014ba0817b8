//! Interactive LLM features over the stored portfolio.
//!
//! Every request that reaches the text generator passes a per-client
//! cooldown first. The portfolio analysis is memoized as a whole.

pub mod analysis;
pub mod context;
pub mod conversation;
pub mod cooldown;
pub mod describe;
pub mod diagram;
pub mod qa;

#[cfg(test)]
pub mod fixture;

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::config::PortfolioConfig;
use crate::llm::{CompletionError, TextGenerator};
pub use context::{PgContext, PortfolioContext};
use conversation::ConversationStore;
use cooldown::Cooldown;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("rate limited")]
    RateLimited,
    #[error("empty question")]
    EmptyQuestion,
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AssistantError {
    /// HTTP-style status for the failure.
    pub fn status_code(&self) -> u16 {
        match self {
            AssistantError::RateLimited => 429,
            AssistantError::EmptyQuestion => 400,
            AssistantError::NotFound(_) => 404,
            AssistantError::Completion(_) => 502,
            AssistantError::Internal(_) => 500,
        }
    }

    /// Message safe to show the person who made the request.
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::RateLimited => "Please try again in a moment (rate limit).".to_string(),
            AssistantError::EmptyQuestion => "Enter a question.".to_string(),
            AssistantError::NotFound(what) => format!("{what} not found."),
            AssistantError::Completion(e) => format!("LLM error: {e}"),
            AssistantError::Internal(_) => "An unexpected error occurred.".to_string(),
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            AssistantError::RateLimited => "rate_limited",
            AssistantError::EmptyQuestion => "rejected",
            AssistantError::NotFound(_) => "not_found",
            AssistantError::Completion(_) => "llm_error",
            AssistantError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantSettings {
    pub cooldown: Duration,
    pub analysis_ttl: Duration,
    pub conversation_ttl: Duration,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(10),
            analysis_ttl: Duration::from_secs(300),
            conversation_ttl: Duration::from_secs(3600),
        }
    }
}

impl From<&PortfolioConfig> for AssistantSettings {
    fn from(config: &PortfolioConfig) -> Self {
        Self {
            cooldown: config.cooldown,
            analysis_ttl: config.analysis_ttl,
            conversation_ttl: config.conversation_ttl,
        }
    }
}

pub struct Assistant {
    generator: Arc<dyn TextGenerator>,
    context: Arc<dyn PortfolioContext>,
    cooldown: Cooldown,
    conversations: ConversationStore,
    analysis: Cache<&'static str, String>,
}

impl Assistant {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        context: Arc<dyn PortfolioContext>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            generator,
            context,
            cooldown: Cooldown::new(settings.cooldown),
            conversations: ConversationStore::new(settings.conversation_ttl),
            analysis: Cache::builder()
                .max_capacity(1)
                .time_to_live(settings.analysis_ttl)
                .build(),
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    fn acquire(&self, scope: &str, client: &str) -> Result<(), AssistantError> {
        if self.cooldown.try_acquire(scope, client) {
            Ok(())
        } else {
            tracing::debug!(scope, client, "Cooldown active, request refused");
            Err(AssistantError::RateLimited)
        }
    }
}

/// Record the outcome of one request and log failures the caller can't act on.
fn finish<T>(kind: &'static str, result: Result<T, AssistantError>) -> Result<T, AssistantError> {
    match &result {
        Ok(_) => crate::metrics::assistant_request(kind, "ok"),
        Err(e) => {
            crate::metrics::assistant_request(kind, e.outcome());
            match e {
                AssistantError::Internal(inner) => {
                    tracing::error!(kind, error = ?inner, "Unexpected error in {kind} request")
                }
                AssistantError::Completion(inner) => {
                    tracing::warn!(kind, error = %inner, "LLM call failed")
                }
                _ => {}
            }
        }
    }
    result
}
