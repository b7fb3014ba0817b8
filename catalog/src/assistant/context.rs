//! Portfolio data the assistant feeds into prompts.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::dashboard::kpi::{self, AppSummary, PortfolioOverview};
use crate::schema::applications;
use crate::services::catalog_service;
use crate::store::PgPool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: i64,
    pub name: String,
}

/// An integration seen from the neighbourhood's centre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub app: NodeRef,
    pub integration_type: String,
}

/// An application with its direct integration partners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbourhood {
    pub app: NodeRef,
    pub inbound: Vec<Link>,
    pub outbound: Vec<Link>,
}

#[async_trait]
pub trait PortfolioContext: Send + Sync {
    async fn overview(&self, top_n: i64, sample_n: i64) -> anyhow::Result<PortfolioOverview>;

    /// The listed applications that exist, in no particular order.
    async fn applications(&self, ids: &[i64]) -> anyhow::Result<Vec<AppSummary>>;

    async fn neighbourhood(&self, id: i64) -> anyhow::Result<Option<Neighbourhood>>;
}

pub struct PgContext {
    pool: PgPool,
}

impl PgContext {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> anyhow::Result<diesel_async::pooled_connection::deadpool::Object<diesel_async::AsyncPgConnection>>
    {
        self.pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))
    }
}

#[async_trait]
impl PortfolioContext for PgContext {
    async fn overview(&self, top_n: i64, sample_n: i64) -> anyhow::Result<PortfolioOverview> {
        let mut conn = self.conn().await?;
        kpi::portfolio_overview(&mut conn, top_n, sample_n).await
    }

    async fn applications(&self, ids: &[i64]) -> anyhow::Result<Vec<AppSummary>> {
        let mut conn = self.conn().await?;
        let rows = applications::table
            .filter(applications::id.eq_any(ids.to_vec()))
            .select((
                applications::id,
                applications::name,
                applications::domain,
                applications::criticality,
                applications::environment,
            ))
            .load::<(i64, String, String, String, String)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, domain, criticality, environment)| AppSummary {
                id,
                name,
                domain,
                criticality,
                environment,
            })
            .collect())
    }

    async fn neighbourhood(&self, id: i64) -> anyhow::Result<Option<Neighbourhood>> {
        let mut conn = self.conn().await?;
        let Some(detail) = catalog_service::application_detail(&mut conn, id).await? else {
            return Ok(None);
        };

        let inbound = detail
            .inbound
            .into_iter()
            .map(|view| Link {
                app: NodeRef {
                    id: view.integration.source_app_id,
                    name: view.source_name,
                },
                integration_type: view.integration.integration_type,
            })
            .collect();
        let outbound = detail
            .outbound
            .into_iter()
            .map(|view| Link {
                app: NodeRef {
                    id: view.integration.target_app_id,
                    name: view.target_name,
                },
                integration_type: view.integration.integration_type,
            })
            .collect();

        Ok(Some(Neighbourhood {
            app: NodeRef {
                id: detail.application.id,
                name: detail.application.name,
            },
            inbound,
            outbound,
        }))
    }
}
