//! In-process store with the same write semantics as [`super::PgStore`].
//!
//! Backs `seed --dry-run` and the seeding tests. Every phase validates
//! before mutating, so a rejected phase leaves the state untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{PortfolioStore, UpsertTally};
use crate::models::application::{AppRef, NewApplication};
use crate::models::capability::{Capability, CapabilityAssignment};
use crate::models::integration::NewIntegration;
use crate::models::tech_debt::NewTechDebtItem;

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    applications: Vec<(i64, NewApplication)>,
    capabilities: Vec<Capability>,
    links: BTreeSet<(i64, i64)>,
    debt: Vec<(i64, NewTechDebtItem)>,
    integrations: Vec<(i64, NewIntegration)>,
}

impl MemoryState {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_app(&self, id: i64) -> bool {
        self.applications.iter().any(|(app_id, _)| *app_id == id)
    }

    fn check_edge(&self, item: &NewIntegration) -> anyhow::Result<()> {
        anyhow::ensure!(
            item.source_app_id != item.target_app_id,
            "integration source and target are both {}",
            item.source_app_id
        );
        for id in [item.source_app_id, item.target_app_id] {
            anyhow::ensure!(self.has_app(id), "application {id} does not exist");
        }
        anyhow::ensure!(item.daily_volume >= 0, "negative daily volume");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn applications(&self) -> Vec<(i64, NewApplication)> {
        self.lock().applications.clone()
    }

    pub fn integrations(&self) -> Vec<(i64, NewIntegration)> {
        self.lock().integrations.clone()
    }

    pub fn tech_debt(&self) -> Vec<NewTechDebtItem> {
        self.lock().debt.iter().map(|(_, item)| item.clone()).collect()
    }

    /// Capabilities linked to an application, by name.
    pub fn capabilities_of(&self, application_id: i64) -> Vec<Capability> {
        let state = self.lock();
        let mut linked: Vec<Capability> = state
            .links
            .iter()
            .filter(|(app, _)| *app == application_id)
            .filter_map(|(_, cap)| state.capabilities.iter().find(|c| c.id == *cap).cloned())
            .collect();
        linked.sort_by(|a, b| a.name.cmp(&b.name));
        linked
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn upsert_applications(
        &self,
        apps: &[NewApplication],
        wipe: bool,
    ) -> anyhow::Result<Vec<AppRef>> {
        for app in apps {
            anyhow::ensure!(
                (0..=100).contains(&app.tech_debt_score),
                "tech debt score {} out of range for {}",
                app.tech_debt_score,
                app.name
            );
        }

        let mut state = self.lock();
        if wipe {
            state.debt.clear();
            state.integrations.clear();
            state.links.clear();
            state.applications.clear();
            state.capabilities.clear();
        }

        let mut stored = Vec::with_capacity(apps.len());
        for app in apps {
            let existing = state
                .applications
                .iter_mut()
                .find(|(_, row)| row.name == app.name);
            let id = match existing {
                Some((id, row)) => {
                    *row = app.clone();
                    *id
                }
                None => {
                    let id = state.allocate();
                    state.applications.push((id, app.clone()));
                    id
                }
            };
            stored.push(AppRef {
                id,
                name: app.name.clone(),
                tech_debt_score: app.tech_debt_score,
            });
        }
        Ok(stored)
    }

    async fn assign_capabilities(
        &self,
        catalog: &[&'static str],
        assignments: &[CapabilityAssignment],
    ) -> anyhow::Result<()> {
        let mut state = self.lock();
        for assignment in assignments {
            anyhow::ensure!(
                state.has_app(assignment.application_id),
                "application {} does not exist",
                assignment.application_id
            );
        }

        for name in catalog {
            if !state.capabilities.iter().any(|c| c.name == *name) {
                let id = state.allocate();
                state.capabilities.push(Capability {
                    id,
                    name: name.to_string(),
                    description: String::new(),
                });
            }
        }
        let ids: HashMap<String, i64> = state
            .capabilities
            .iter()
            .map(|c| (c.name.clone(), c.id))
            .collect();

        for assignment in assignments {
            state.links.retain(|(app, _)| *app != assignment.application_id);
            for name in &assignment.capabilities {
                if let Some(&cap) = ids.get(*name) {
                    state.links.insert((assignment.application_id, cap));
                }
            }
        }
        Ok(())
    }

    async fn insert_tech_debt(&self, items: &[NewTechDebtItem]) -> anyhow::Result<usize> {
        let mut state = self.lock();
        for item in items {
            anyhow::ensure!(
                state.has_app(item.application_id),
                "application {} does not exist",
                item.application_id
            );
        }
        for item in items {
            let id = state.allocate();
            state.debt.push((id, item.clone()));
        }
        Ok(items.len())
    }

    async fn list_app_refs(&self) -> anyhow::Result<Vec<AppRef>> {
        let mut refs: Vec<AppRef> = self
            .lock()
            .applications
            .iter()
            .map(|(id, app)| AppRef {
                id: *id,
                name: app.name.clone(),
                tech_debt_score: app.tech_debt_score,
            })
            .collect();
        refs.sort_by_key(|r| r.id);
        Ok(refs)
    }

    async fn upsert_integrations(&self, items: &[NewIntegration]) -> anyhow::Result<UpsertTally> {
        let mut state = self.lock();
        for item in items {
            state.check_edge(item)?;
        }

        let mut tally = UpsertTally::default();
        for item in items {
            let existing = state
                .integrations
                .iter_mut()
                .find(|(_, row)| row.upsert_key() == item.upsert_key());
            match existing {
                Some((_, row)) => {
                    *row = item.clone();
                    tally.updated += 1;
                }
                None => {
                    let id = state.allocate();
                    state.integrations.push((id, item.clone()));
                    tally.created += 1;
                }
            }
        }
        Ok(tally)
    }

    async fn edge_endpoints(&self) -> anyhow::Result<Vec<(i64, i64)>> {
        Ok(self
            .lock()
            .integrations
            .iter()
            .map(|(_, row)| (row.source_app_id, row.target_app_id))
            .collect())
    }

    async fn insert_integrations(&self, items: &[NewIntegration]) -> anyhow::Result<usize> {
        let mut state = self.lock();
        for item in items {
            state.check_edge(item)?;
        }
        for item in items {
            let id = state.allocate();
            state.integrations.push((id, item.clone()));
        }
        Ok(items.len())
    }
}
