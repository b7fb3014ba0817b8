//! Last question and answer per session, with expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::Serialize;
use uuid::Uuid;

const MAX_SESSIONS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub session_id: String,
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

pub struct ConversationStore {
    records: Cache<String, Conversation>,
}

impl ConversationStore {
    pub fn new(ttl: Duration) -> Self {
        let records = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_live(ttl)
            .build();
        Self { records }
    }

    /// Replace the session's record, opening a new session when none is given.
    pub fn record(&self, session_id: Option<&str>, question: &str, answer: &str) -> Conversation {
        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let conversation = Conversation {
            session_id: session_id.clone(),
            question: question.to_string(),
            answer: answer.to_string(),
            asked_at: Utc::now(),
        };
        self.records.insert(session_id, conversation.clone());
        conversation
    }

    pub fn last(&self, session_id: &str) -> Option<Conversation> {
        self.records.get(session_id)
    }
}
