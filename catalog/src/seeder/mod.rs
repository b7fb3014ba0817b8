//! Mock portfolio seeding.
//!
//! Phases, in order:
//! 1. generate applications in batches and normalize them
//! 2. upsert applications (optionally wiping first)
//! 3. assign capabilities and create debt items for every stored application
//! 4. generate integrations, topping up a shortfall locally
//! 5. resolve endpoint names and upsert integrations
//! 6. close the ring so every application has inbound and outbound edges
//!
//! Generation never fails the run: a phase that under-delivers is logged
//! and seeding carries on with what it has.

pub mod batch;
pub mod coverage;
pub mod fallback;
pub mod fields;
pub mod pools;
pub mod prompts;
pub mod sanitize;

use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use rand::Rng;

use crate::llm::TextGenerator;
use crate::store::PortfolioStore;
use batch::{run_batches, ApplicationSource, BatchPlan, IntegrationSource};

/// Floor for the integration target, whatever the application count.
pub const MIN_INTEGRATIONS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    pub apps: usize,
    pub wipe: bool,
    pub batch: usize,
    pub max_attempts: usize,
    pub int_batch: usize,
    pub int_max_attempts: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            apps: 40,
            wipe: false,
            batch: 8,
            max_attempts: 25,
            int_batch: 25,
            int_max_attempts: 12,
        }
    }
}

impl SeedOptions {
    /// Batch sizes and attempt ceilings raised to at least one.
    pub fn clamped(self) -> Self {
        Self {
            batch: self.batch.max(1),
            max_attempts: self.max_attempts.max(1),
            int_batch: self.int_batch.max(1),
            int_max_attempts: self.int_max_attempts.max(1),
            ..self
        }
    }

    pub fn integration_target(&self) -> usize {
        MIN_INTEGRATIONS.max(self.apps * 2)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub apps_requested: usize,
    pub apps_seeded: usize,
    pub app_attempts: usize,
    pub debt_items: usize,
    pub integrations_target: usize,
    pub integrations_generated: usize,
    pub integrations_fallback: usize,
    pub integration_attempts: usize,
    pub integrations_created: usize,
    pub integrations_updated: usize,
    pub integrations_skipped: usize,
    pub ring_edges: usize,
}

impl SeedReport {
    /// Whether the generator delivered fewer applications than requested.
    pub fn is_short(&self) -> bool {
        self.apps_seeded < self.apps_requested
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Applications seeded: {}/{} ({} attempts)",
            self.apps_seeded, self.apps_requested, self.app_attempts
        )?;
        writeln!(f, "TechDebtItems created: {}", self.debt_items)?;
        writeln!(
            f,
            "Integrations generated: {} via LLM ({} attempts), {} via fallback, target {}",
            self.integrations_generated,
            self.integration_attempts,
            self.integrations_fallback,
            self.integrations_target
        )?;
        writeln!(
            f,
            "Integrations created: {}, updated: {}",
            self.integrations_created, self.integrations_updated
        )?;
        writeln!(f, "Integrations skipped: {}", self.integrations_skipped)?;
        writeln!(f, "Ring coverage edges added: {}", self.ring_edges)?;
        if self.is_short() {
            write!(f, "Seed finished with fewer applications than requested")
        } else {
            write!(f, "Seed finished")
        }
    }
}

pub async fn run_seed<R: Rng + ?Sized>(
    options: SeedOptions,
    generator: &dyn TextGenerator,
    store: &dyn PortfolioStore,
    rng: &mut R,
) -> anyhow::Result<SeedReport> {
    let options = options.clamped();
    let mut report = SeedReport {
        apps_requested: options.apps,
        integrations_target: options.integration_target(),
        ..SeedReport::default()
    };

    // Applications
    tracing::info!(
        target_apps = options.apps,
        batch = options.batch,
        "Generating {} applications via LLM (batch={})",
        options.apps,
        options.batch
    );
    let plan = BatchPlan {
        target: options.apps,
        batch_size: options.batch,
        max_attempts: options.max_attempts,
    };
    let generated = run_batches(plan, &ApplicationSource, generator).await;
    report.app_attempts = generated.attempts;

    if generated.items.len() < options.apps {
        tracing::warn!(
            collected = generated.items.len(),
            target_count = options.apps,
            attempts = generated.attempts,
            "LLM produced only {}/{} unique apps after {} attempts. Seeding what we have.",
            generated.items.len(),
            options.apps,
            generated.attempts
        );
    }

    let apps: Vec<_> = generated
        .items
        .iter()
        .take(options.apps)
        .map(|raw| fields::normalize_application(raw, rng))
        .collect();
    if apps.is_empty() {
        tracing::error!("No applications generated. Nothing to seed.");
        return Ok(report);
    }

    let seeded = store
        .upsert_applications(&apps, options.wipe)
        .await
        .context("seeding applications")?;
    report.apps_seeded = seeded.len();
    tracing::info!(count = seeded.len(), "Applications seeded: {}", seeded.len());

    let name_to_id: HashMap<String, i64> =
        seeded.iter().map(|app| (app.name.clone(), app.id)).collect();
    let app_names: Vec<String> = seeded.iter().map(|app| app.name.clone()).collect();

    // Capabilities and debt items, over every stored application
    let all_apps = store.list_app_refs().await.context("listing applications")?;
    let assignments = coverage::plan_capabilities(&all_apps, rng);
    store
        .assign_capabilities(pools::CAPABILITIES, &assignments)
        .await
        .context("assigning capabilities")?;

    let debt = coverage::plan_tech_debt(&all_apps, chrono::Utc::now(), rng);
    report.debt_items = store
        .insert_tech_debt(&debt)
        .await
        .context("creating tech debt items")?;
    tracing::info!(count = report.debt_items, "TechDebtItems created: {}", report.debt_items);

    // Integrations
    let target = report.integrations_target;
    tracing::info!(
        target_integrations = target,
        batch = options.int_batch,
        "Generating {} integrations via LLM (batch={})",
        target,
        options.int_batch
    );
    let plan = BatchPlan {
        target,
        batch_size: options.int_batch,
        max_attempts: options.int_max_attempts,
    };
    let source = IntegrationSource { app_names };
    let mut raw_integrations = run_batches(plan, &source, generator).await;
    report.integration_attempts = raw_integrations.attempts;
    report.integrations_generated = raw_integrations.items.len();

    if raw_integrations.items.len() < target {
        let missing = target - raw_integrations.items.len();
        tracing::warn!(
            collected = raw_integrations.items.len(),
            target_count = target,
            missing,
            "LLM produced only {}/{} integrations. Using fallback generator for remaining {}.",
            raw_integrations.items.len(),
            target,
            missing
        );
        let synthesized = fallback::fallback_integrations(&source.app_names, missing, rng);
        report.integrations_fallback = synthesized.len();
        raw_integrations.items.extend(synthesized);
    }

    let drafts: Vec<_> = raw_integrations
        .items
        .iter()
        .take(target)
        .map(|raw| fields::normalize_integration(raw, rng))
        .collect();
    let (resolved, skipped) = coverage::resolve_integrations(drafts, &name_to_id);
    let tally = store
        .upsert_integrations(&resolved)
        .await
        .context("seeding integrations")?;
    report.integrations_created = tally.created;
    report.integrations_updated = tally.updated;
    report.integrations_skipped = skipped;
    crate::metrics::integrations_skipped(skipped);

    // Ring coverage
    let all_apps = store.list_app_refs().await.context("listing applications")?;
    if all_apps.len() >= 2 {
        let edges = store.edge_endpoints().await.context("loading integration edges")?;
        let ring = coverage::plan_ring_closure(&all_apps, &edges, rng);
        report.ring_edges = store
            .insert_integrations(&ring)
            .await
            .context("closing integration ring")?;
        crate::metrics::ring_edges_added(report.ring_edges);
        tracing::info!(
            added = report.ring_edges,
            "Ring coverage ensured. Added {} integrations.",
            report.ring_edges
        );
    } else {
        tracing::warn!("Ring coverage skipped (need at least 2 apps).");
    }

    tracing::info!(
        created = report.integrations_created,
        updated = report.integrations_updated,
        skipped = report.integrations_skipped,
        "Seed finished"
    );
    Ok(report)
}
