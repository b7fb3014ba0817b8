//! Fixed portfolio context for assistant tests.

use std::sync::Arc;

use async_trait::async_trait;

use super::context::{Link, Neighbourhood, NodeRef, PortfolioContext};
use super::{Assistant, AssistantSettings};
use crate::dashboard::kpi::{AppSummary, LabelCount, PortfolioOverview};
use crate::llm::stub::ScriptedGenerator;

pub struct FixtureContext {
    pub apps: Vec<AppSummary>,
    /// (source, target, integration_type)
    pub edges: Vec<(i64, i64, &'static str)>,
}

fn summary(id: i64, name: &str, domain: &str, criticality: &str) -> AppSummary {
    AppSummary {
        id,
        name: name.to_string(),
        domain: domain.to_string(),
        criticality: criticality.to_string(),
        environment: "PROD".to_string(),
    }
}

impl Default for FixtureContext {
    fn default() -> Self {
        Self {
            apps: vec![
                summary(1, "Core Ledger", "CoreBanking", "High"),
                summary(2, "Fraud Hub", "Risk", "High"),
                summary(3, "CRM Suite", "CRM", "Medium"),
            ],
            edges: vec![(1, 2, "API"), (3, 1, "message")],
        }
    }
}

impl FixtureContext {
    fn node(&self, id: i64) -> NodeRef {
        let name = self
            .apps
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        NodeRef { id, name }
    }
}

#[async_trait]
impl PortfolioContext for FixtureContext {
    async fn overview(&self, top_n: i64, sample_n: i64) -> anyhow::Result<PortfolioOverview> {
        let mut domains: Vec<LabelCount> = Vec::new();
        for app in &self.apps {
            match domains.iter_mut().find(|c| c.label == app.domain) {
                Some(c) => c.count += 1,
                None => domains.push(LabelCount {
                    label: app.domain.clone(),
                    count: 1,
                }),
            }
        }
        domains.truncate(top_n as usize);
        Ok(PortfolioOverview {
            total_apps: self.apps.len() as i64,
            by_domain: domains,
            by_criticality: Vec::new(),
            by_environment: Vec::new(),
            sample_apps: self.apps.iter().take(sample_n as usize).cloned().collect(),
        })
    }

    async fn applications(&self, ids: &[i64]) -> anyhow::Result<Vec<AppSummary>> {
        Ok(self
            .apps
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn neighbourhood(&self, id: i64) -> anyhow::Result<Option<Neighbourhood>> {
        if !self.apps.iter().any(|a| a.id == id) {
            return Ok(None);
        }
        let link = |other: i64, kind: &str| Link {
            app: self.node(other),
            integration_type: kind.to_string(),
        };
        Ok(Some(Neighbourhood {
            app: self.node(id),
            inbound: self
                .edges
                .iter()
                .filter(|(_, t, _)| *t == id)
                .map(|(s, _, kind)| link(*s, kind))
                .collect(),
            outbound: self
                .edges
                .iter()
                .filter(|(s, _, _)| *s == id)
                .map(|(_, t, kind)| link(*t, kind))
                .collect(),
        }))
    }
}

/// An assistant over the default fixture, answering through `generator`.
pub fn assistant(generator: Arc<ScriptedGenerator>) -> Assistant {
    Assistant::new(
        generator,
        Arc::new(FixtureContext::default()),
        AssistantSettings::default(),
    )
}
