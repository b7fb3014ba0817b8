//! PostgreSQL store on diesel-async.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use super::{PortfolioStore, UpsertTally};
use crate::models::application::{AppRef, NewApplication};
use crate::models::capability::{CapabilityAssignment, NewApplicationCapability, NewCapability};
use crate::models::integration::NewIntegration;
use crate::models::tech_debt::NewTechDebtItem;
use crate::schema::{application_capabilities, applications, capabilities, integrations, tech_debt_items};

pub type PgPool = Pool<AsyncPgConnection>;

const POOL_MAX_SIZE: usize = 5;

pub fn connect_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Pool::builder(manager)
        .max_size(POOL_MAX_SIZE)
        .build()
        .context("building diesel pool")
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> anyhow::Result<diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))
    }
}

/// Delete all portfolio rows, children before parents.
async fn wipe_all(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    diesel::delete(tech_debt_items::table).execute(conn).await?;
    diesel::delete(integrations::table).execute(conn).await?;
    diesel::delete(application_capabilities::table).execute(conn).await?;
    diesel::delete(applications::table).execute(conn).await?;
    diesel::delete(capabilities::table).execute(conn).await?;
    Ok(())
}

async fn upsert_application(
    conn: &mut AsyncPgConnection,
    app: &NewApplication,
) -> anyhow::Result<AppRef> {
    let returning = (applications::id, applications::name, applications::tech_debt_score);
    let existing = applications::table
        .filter(applications::name.eq(&app.name))
        .select(applications::id)
        .order(applications::id.asc())
        .first::<i64>(conn)
        .await
        .optional()?;

    let row = match existing {
        Some(id) => {
            diesel::update(applications::table.find(id))
                .set((app, applications::write_date.eq(Some(Utc::now()))))
                .returning(returning)
                .get_result::<AppRef>(conn)
                .await?
        }
        None => {
            diesel::insert_into(applications::table)
                .values(app)
                .returning(returning)
                .get_result::<AppRef>(conn)
                .await?
        }
    };
    Ok(row)
}

/// Returns true when a new row was created.
async fn upsert_integration(
    conn: &mut AsyncPgConnection,
    item: &NewIntegration,
) -> anyhow::Result<bool> {
    let (source, target, kind) = item.upsert_key();
    let existing = integrations::table
        .filter(integrations::source_app_id.eq(source))
        .filter(integrations::target_app_id.eq(target))
        .filter(integrations::integration_type.eq(kind))
        .select(integrations::id)
        .order(integrations::id.asc())
        .first::<i64>(conn)
        .await
        .optional()?;

    match existing {
        Some(id) => {
            diesel::update(integrations::table.find(id))
                .set((item, integrations::write_date.eq(Some(Utc::now()))))
                .execute(conn)
                .await?;
            Ok(false)
        }
        None => {
            diesel::insert_into(integrations::table)
                .values(item)
                .execute(conn)
                .await?;
            Ok(true)
        }
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn upsert_applications(
        &self,
        apps: &[NewApplication],
        wipe: bool,
    ) -> anyhow::Result<Vec<AppRef>> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                if wipe {
                    tracing::warn!("Wiping existing portfolio data");
                    wipe_all(conn).await?;
                }
                let mut stored = Vec::with_capacity(apps.len());
                for app in apps {
                    stored.push(upsert_application(conn, app).await?);
                }
                Ok(stored)
            }
            .scope_boxed()
        })
        .await
    }

    async fn assign_capabilities(
        &self,
        catalog: &[&'static str],
        assignments: &[CapabilityAssignment],
    ) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let rows: Vec<NewCapability<'_>> =
                    catalog.iter().map(|name| NewCapability { name: *name }).collect();
                diesel::insert_into(capabilities::table)
                    .values(&rows)
                    .on_conflict(capabilities::name)
                    .do_nothing()
                    .execute(conn)
                    .await?;

                let ids: HashMap<String, i64> = capabilities::table
                    .filter(capabilities::name.eq_any(catalog.to_vec()))
                    .select((capabilities::name, capabilities::id))
                    .load::<(String, i64)>(conn)
                    .await?
                    .into_iter()
                    .collect();

                for assignment in assignments {
                    diesel::delete(
                        application_capabilities::table.filter(
                            application_capabilities::application_id.eq(assignment.application_id),
                        ),
                    )
                    .execute(conn)
                    .await?;

                    let links: Vec<NewApplicationCapability> = assignment
                        .capabilities
                        .iter()
                        .filter_map(|name| ids.get(*name))
                        .map(|&capability_id| NewApplicationCapability {
                            application_id: assignment.application_id,
                            capability_id,
                        })
                        .collect();
                    if !links.is_empty() {
                        diesel::insert_into(application_capabilities::table)
                            .values(&links)
                            .on_conflict_do_nothing()
                            .execute(conn)
                            .await?;
                    }
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn insert_tech_debt(&self, items: &[NewTechDebtItem]) -> anyhow::Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let n = diesel::insert_into(tech_debt_items::table)
                    .values(items)
                    .execute(conn)
                    .await?;
                Ok(n)
            }
            .scope_boxed()
        })
        .await
    }

    async fn list_app_refs(&self) -> anyhow::Result<Vec<AppRef>> {
        let mut conn = self.conn().await?;
        let refs = applications::table
            .select((applications::id, applications::name, applications::tech_debt_score))
            .order(applications::id.asc())
            .load::<AppRef>(&mut conn)
            .await?;
        Ok(refs)
    }

    async fn upsert_integrations(&self, items: &[NewIntegration]) -> anyhow::Result<UpsertTally> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let mut tally = UpsertTally::default();
                for item in items {
                    if upsert_integration(conn, item).await? {
                        tally.created += 1;
                    } else {
                        tally.updated += 1;
                    }
                }
                Ok(tally)
            }
            .scope_boxed()
        })
        .await
    }

    async fn edge_endpoints(&self) -> anyhow::Result<Vec<(i64, i64)>> {
        let mut conn = self.conn().await?;
        let edges = integrations::table
            .select((integrations::source_app_id, integrations::target_app_id))
            .load::<(i64, i64)>(&mut conn)
            .await?;
        Ok(edges)
    }

    async fn insert_integrations(&self, items: &[NewIntegration]) -> anyhow::Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            async move {
                let n = diesel::insert_into(integrations::table)
                    .values(items)
                    .execute(conn)
                    .await?;
                Ok(n)
            }
            .scope_boxed()
        })
        .await
    }
}
