//! Free-text questions over the portfolio.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use serde::Serialize;

use super::conversation::Conversation;
use super::{finish, Assistant, AssistantError};
use crate::dashboard::kpi::AppSummary;

static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Application ID\s*:\s*(\d+)").expect("valid citation regex"));

#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub conversation: Conversation,
    /// Applications cited in the answer that exist, in citation order.
    pub cited: Vec<AppSummary>,
}

/// Ids cited as "Application ID: <n>", first occurrence order.
pub fn cited_ids(answer: &str) -> Vec<i64> {
    let mut seen = HashSet::new();
    CITATION
        .captures_iter(answer)
        .filter_map(|c| c[1].parse::<i64>().ok())
        .filter(|id| seen.insert(*id))
        .collect()
}

fn qa_prompt(overview_json: &str, question: &str) -> String {
    format!(
        "You are an analyst of a bank's application portfolio. Answer briefly and concretely.\n\n\
         REQUIRED ANSWER FORMAT:\n\
         1) Short summary (1-2 sentences)\n\
         2) Results as bullet points. For each bullet give \"Application ID: <id>\" and the name, \
         with a short justification based on the data.\n\n\
         DATA (aggregates + sample):\n{overview_json}\n\n\
         USER QUESTION:\n{question}"
    )
}

impl Assistant {
    /// Answer a question, remembering it as the session's latest exchange.
    pub async fn ask_question(
        &self,
        client: &str,
        session_id: Option<&str>,
        question: &str,
    ) -> Result<QaAnswer, AssistantError> {
        finish("qa", self.answer(client, session_id, question.trim()).await)
    }

    async fn answer(
        &self,
        client: &str,
        session_id: Option<&str>,
        question: &str,
    ) -> Result<QaAnswer, AssistantError> {
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }
        self.acquire("qa", client)?;

        let overview = self.context.overview(8, 25).await?;
        let data = serde_json::to_string(&overview).context("serialize portfolio overview")?;
        let answer = self.generator.generate(&qa_prompt(&data, question)).await?;

        let conversation = self.conversations.record(session_id, question, &answer);
        let ids = cited_ids(&answer);
        let cited = if ids.is_empty() {
            Vec::new()
        } else {
            let found = self.context.applications(&ids).await?;
            ids.iter()
                .filter_map(|id| found.iter().find(|a| a.id == *id).cloned())
                .collect()
        };

        tracing::info!(
            session = %conversation.session_id,
            cited = cited.len(),
            "Answered portfolio question"
        );
        Ok(QaAnswer {
            conversation,
            cited,
        })
    }
}
