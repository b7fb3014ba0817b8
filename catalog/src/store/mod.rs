//! Persistence writer for seeded portfolio data.
//!
//! Each trait method is one logical write phase and lands atomically.

pub mod memory;
pub mod pg;

use async_trait::async_trait;

use crate::models::application::{AppRef, NewApplication};
use crate::models::capability::CapabilityAssignment;
use crate::models::integration::NewIntegration;
use crate::models::tech_debt::NewTechDebtItem;

pub use memory::MemoryStore;
pub use pg::{connect_pool, PgPool, PgStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertTally {
    pub created: usize,
    pub updated: usize,
}

#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Upsert applications by exact name, optionally wiping all portfolio
    /// data first. Returns the stored rows in input order.
    async fn upsert_applications(
        &self,
        apps: &[NewApplication],
        wipe: bool,
    ) -> anyhow::Result<Vec<AppRef>>;

    /// Ensure every catalog capability exists, then replace each listed
    /// application's capability set.
    async fn assign_capabilities(
        &self,
        catalog: &[&'static str],
        assignments: &[CapabilityAssignment],
    ) -> anyhow::Result<()>;

    async fn insert_tech_debt(&self, items: &[NewTechDebtItem]) -> anyhow::Result<usize>;

    /// Every stored application, ordered by id.
    async fn list_app_refs(&self) -> anyhow::Result<Vec<AppRef>>;

    /// Upsert by (source, target, integration_type), overwriting the
    /// remaining fields on a match.
    async fn upsert_integrations(&self, items: &[NewIntegration]) -> anyhow::Result<UpsertTally>;

    /// (source, target) of every stored integration.
    async fn edge_endpoints(&self) -> anyhow::Result<Vec<(i64, i64)>>;

    async fn insert_integrations(&self, items: &[NewIntegration]) -> anyhow::Result<usize>;
}
