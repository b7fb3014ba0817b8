//! Whole-portfolio analysis, memoized for every viewer.

use anyhow::Context;
use serde::Serialize;

use super::{finish, Assistant, AssistantError};

const MEMO_KEY: &str = "analysis:latest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioAnalysis {
    pub text: String,
    /// Served from the memo rather than generated for this request.
    pub cached: bool,
}

fn analysis_prompt(overview_json: &str) -> String {
    format!(
        "You are a senior enterprise architect at a bank. \
         Based on the data, produce a quick analysis of the application portfolio.\n\n\
         Write concisely. 250-350 words at most.\n\n\
         FORMAT:\n\
         1) Summary (2-3 sentences)\n\
         2) 3 main risks (bullet points)\n\
         3) Top 5 applications to modernise (ID + name + one sentence why)\n\
         4) 3 recommended next steps\n\n\
         DATA:\n{overview_json}"
    )
}

impl Assistant {
    pub async fn analyze_portfolio(&self, client: &str) -> Result<PortfolioAnalysis, AssistantError> {
        if let Some(text) = self.analysis.get(MEMO_KEY) {
            crate::metrics::assistant_request("analysis", "cached");
            return Ok(PortfolioAnalysis { text, cached: true });
        }
        finish("analysis", self.fresh_analysis(client).await)
    }

    async fn fresh_analysis(&self, client: &str) -> Result<PortfolioAnalysis, AssistantError> {
        self.acquire("analysis", client)?;

        let overview = self.context.overview(6, 15).await?;
        let data = serde_json::to_string(&overview).context("serialize portfolio overview")?;
        let text = self.generator.generate(&analysis_prompt(&data)).await?;

        self.analysis.insert(MEMO_KEY, text.clone());
        tracing::info!(total_apps = overview.total_apps, "Generated portfolio analysis");
        Ok(PortfolioAnalysis {
            text,
            cached: false,
        })
    }
}
