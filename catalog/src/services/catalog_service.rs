//! Read-side catalog queries and integration CRUD.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::models::application::Application;
use crate::models::capability::Capability;
use crate::models::integration::{Integration, NewIntegration};
use crate::models::tech_debt::TechDebtItem;
use crate::schema::{application_capabilities, applications, capabilities, integrations, tech_debt_items};
use crate::seeder::fields::is_allowed;

/// Application list filters. Blank values are ignored.
#[derive(Debug, Clone, Default)]
pub struct AppFilter {
    /// Case-insensitive match on name, domain, vendor or tech stack.
    pub q: Option<String>,
    pub domain: Option<String>,
    pub criticality: Option<String>,
    pub environment: Option<String>,
    pub region: Option<String>,
    pub hosting: Option<String>,
    pub vendor: Option<String>,
    pub data_sensitivity: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `%text%` with LIKE wildcards escaped.
fn contains_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn list_applications(
    conn: &mut AsyncPgConnection,
    filter: &AppFilter,
) -> anyhow::Result<Vec<Application>> {
    let mut query = applications::table
        .select(Application::as_select())
        .order(applications::name.asc())
        .into_boxed();

    if let Some(q) = present(&filter.q) {
        let pattern = contains_pattern(q);
        query = query.filter(
            applications::name
                .ilike(pattern.clone())
                .or(applications::domain.ilike(pattern.clone()))
                .or(applications::vendor.ilike(pattern.clone()))
                .or(applications::tech_stack.ilike(pattern)),
        );
    }
    if let Some(v) = present(&filter.domain) {
        query = query.filter(applications::domain.eq(v.to_string()));
    }
    if let Some(v) = present(&filter.criticality) {
        query = query.filter(applications::criticality.eq(v.to_string()));
    }
    if let Some(v) = present(&filter.environment) {
        query = query.filter(applications::environment.eq(v.to_string()));
    }
    if let Some(v) = present(&filter.region) {
        query = query.filter(applications::region.eq(v.to_string()));
    }
    if let Some(v) = present(&filter.hosting) {
        query = query.filter(applications::hosting.eq(v.to_string()));
    }
    if let Some(v) = present(&filter.vendor) {
        query = query.filter(applications::vendor.eq(v.to_string()));
    }
    if let Some(v) = present(&filter.data_sensitivity) {
        query = query.filter(applications::data_sensitivity.eq(v.to_string()));
    }

    Ok(query.load(conn).await?)
}

/// Distinct values offered for each filterable column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationFacets {
    pub domains: Vec<String>,
    pub criticalities: Vec<String>,
    pub environments: Vec<String>,
    pub regions: Vec<String>,
    pub hostings: Vec<String>,
    pub vendors: Vec<String>,
    pub sensitivities: Vec<String>,
    pub total_count: usize,
    pub filtered_count: usize,
}

type FacetRow = (String, String, String, String, String, String, String);

fn collect_facets(rows: &[FacetRow], filtered_count: usize) -> ApplicationFacets {
    fn sorted<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
        values.cloned().collect::<BTreeSet<_>>().into_iter().collect()
    }

    ApplicationFacets {
        domains: sorted(rows.iter().map(|r| &r.0)),
        criticalities: sorted(rows.iter().map(|r| &r.1)),
        environments: sorted(rows.iter().map(|r| &r.2)),
        regions: sorted(rows.iter().map(|r| &r.3)),
        hostings: sorted(rows.iter().map(|r| &r.4)),
        vendors: sorted(rows.iter().map(|r| &r.5)),
        sensitivities: sorted(rows.iter().map(|r| &r.6)),
        total_count: rows.len(),
        filtered_count,
    }
}

pub async fn facets(
    conn: &mut AsyncPgConnection,
    filter: &AppFilter,
) -> anyhow::Result<ApplicationFacets> {
    let rows = applications::table
        .select((
            applications::domain,
            applications::criticality,
            applications::environment,
            applications::region,
            applications::hosting,
            applications::vendor,
            applications::data_sensitivity,
        ))
        .load::<FacetRow>(conn)
        .await?;
    let filtered = list_applications(conn, filter).await?.len();
    Ok(collect_facets(&rows, filtered))
}

/// An integration with both endpoint names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationView {
    #[serde(flatten)]
    pub integration: Integration,
    pub source_name: String,
    pub target_name: String,
}

async fn application_names(conn: &mut AsyncPgConnection) -> anyhow::Result<HashMap<i64, String>> {
    let names = applications::table
        .select((applications::id, applications::name))
        .load::<(i64, String)>(conn)
        .await?;
    Ok(names.into_iter().collect())
}

fn with_names(rows: Vec<Integration>, names: &HashMap<i64, String>) -> Vec<IntegrationView> {
    let name = |id: i64| names.get(&id).cloned().unwrap_or_else(|| format!("#{id}"));
    rows.into_iter()
        .map(|integration| IntegrationView {
            source_name: name(integration.source_app_id),
            target_name: name(integration.target_app_id),
            integration,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub capabilities: Vec<Capability>,
    pub outbound: Vec<IntegrationView>,
    pub inbound: Vec<IntegrationView>,
    pub tech_debt: Vec<TechDebtItem>,
}

pub async fn find_application(
    conn: &mut AsyncPgConnection,
    id: i64,
) -> anyhow::Result<Option<Application>> {
    let app = applications::table
        .find(id)
        .select(Application::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(app)
}

pub async fn application_detail(
    conn: &mut AsyncPgConnection,
    id: i64,
) -> anyhow::Result<Option<ApplicationDetail>> {
    let Some(application) = find_application(conn, id).await? else {
        return Ok(None);
    };

    let capabilities = application_capabilities::table
        .inner_join(capabilities::table)
        .filter(application_capabilities::application_id.eq(id))
        .select(Capability::as_select())
        .order(capabilities::name.asc())
        .load(conn)
        .await?;

    let names = application_names(conn).await?;
    let outbound = integrations::table
        .filter(integrations::source_app_id.eq(id))
        .select(Integration::as_select())
        .order(integrations::id.asc())
        .load(conn)
        .await?;
    let inbound = integrations::table
        .filter(integrations::target_app_id.eq(id))
        .select(Integration::as_select())
        .order(integrations::id.asc())
        .load(conn)
        .await?;

    let tech_debt = tech_debt_items::table
        .filter(tech_debt_items::application_id.eq(id))
        .select(TechDebtItem::as_select())
        .order(tech_debt_items::id.asc())
        .load(conn)
        .await?;

    Ok(Some(ApplicationDetail {
        application,
        capabilities,
        outbound: with_names(outbound, &names),
        inbound: with_names(inbound, &names),
        tech_debt,
    }))
}

/// Integrations by daily volume, largest first.
pub async fn list_integrations(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<IntegrationView>> {
    let rows = integrations::table
        .select(Integration::as_select())
        .order((integrations::daily_volume.desc(), integrations::id.asc()))
        .load(conn)
        .await?;
    let names = application_names(conn).await?;
    Ok(with_names(rows, &names))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("source and target must be different applications")]
    SelfLoop,
    #[error("application {0} does not exist")]
    UnknownApplication(i64),
    #[error("invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("daily volume must be non-negative, got {0}")]
    NegativeVolume(i64),
    #[error("integration {0} not found")]
    NotFound(i64),
}

/// Field-level checks that need no database access.
pub fn validate_integration(item: &NewIntegration) -> Result<(), IntegrationError> {
    if item.source_app_id == item.target_app_id {
        return Err(IntegrationError::SelfLoop);
    }
    let enumerated = [
        ("integration_type", &item.integration_type),
        ("direction", &item.direction),
        ("data_sensitivity", &item.data_sensitivity),
    ];
    for (field, value) in enumerated {
        if !is_allowed(field, value) {
            return Err(IntegrationError::InvalidValue {
                field,
                value: value.clone(),
            });
        }
    }
    if item.daily_volume < 0 {
        return Err(IntegrationError::NegativeVolume(item.daily_volume));
    }
    Ok(())
}

async fn check_endpoints(conn: &mut AsyncPgConnection, item: &NewIntegration) -> anyhow::Result<()> {
    validate_integration(item)?;
    for id in [item.source_app_id, item.target_app_id] {
        let exists: i64 = applications::table
            .filter(applications::id.eq(id))
            .count()
            .get_result(conn)
            .await?;
        if exists == 0 {
            return Err(IntegrationError::UnknownApplication(id).into());
        }
    }
    Ok(())
}

pub async fn create_integration(
    conn: &mut AsyncPgConnection,
    item: NewIntegration,
) -> anyhow::Result<Integration> {
    check_endpoints(conn, &item).await?;
    let created = diesel::insert_into(integrations::table)
        .values(&item)
        .returning(Integration::as_returning())
        .get_result(conn)
        .await?;
    tracing::info!(
        integration_id = created.id,
        source = created.source_app_id,
        target_app = created.target_app_id,
        "Integration created"
    );
    Ok(created)
}

pub async fn update_integration(
    conn: &mut AsyncPgConnection,
    id: i64,
    item: NewIntegration,
) -> anyhow::Result<Integration> {
    check_endpoints(conn, &item).await?;
    let updated = diesel::update(integrations::table.find(id))
        .set((&item, integrations::write_date.eq(Some(Utc::now()))))
        .returning(Integration::as_returning())
        .get_result(conn)
        .await
        .optional()?
        .ok_or(IntegrationError::NotFound(id))?;
    tracing::info!(integration_id = id, "Integration updated");
    Ok(updated)
}

pub async fn delete_integration(conn: &mut AsyncPgConnection, id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(integrations::table.find(id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(IntegrationError::NotFound(id).into());
    }
    tracing::info!(integration_id = id, "Integration deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> NewIntegration {
        NewIntegration {
            source_app_id: 1,
            target_app_id: 2,
            integration_type: "API".to_string(),
            direction: "async".to_string(),
            daily_volume: 0,
            data_sensitivity: "Medium".to_string(),
            transport: String::new(),
            frequency: String::new(),
            interface_name: String::new(),
        }
    }

    #[test]
    fn valid_integration_passes() {
        assert_eq!(validate_integration(&item()), Ok(()));
    }

    #[test]
    fn self_loop_is_rejected() {
        let looped = NewIntegration {
            target_app_id: 1,
            ..item()
        };
        assert_eq!(validate_integration(&looped), Err(IntegrationError::SelfLoop));
    }

    #[test]
    fn enumerated_fields_are_checked() {
        let bad = NewIntegration {
            direction: "both".to_string(),
            ..item()
        };
        assert_eq!(
            validate_integration(&bad),
            Err(IntegrationError::InvalidValue {
                field: "direction",
                value: "both".to_string()
            })
        );

        let bad = NewIntegration {
            integration_type: "api".to_string(),
            ..item()
        };
        assert!(matches!(
            validate_integration(&bad),
            Err(IntegrationError::InvalidValue { field: "integration_type", .. })
        ));
    }

    #[test]
    fn negative_volume_is_rejected() {
        let bad = NewIntegration {
            daily_volume: -5,
            ..item()
        };
        assert_eq!(validate_integration(&bad), Err(IntegrationError::NegativeVolume(-5)));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("core"), "%core%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(present(&Some("  ".to_string())), None);
        assert_eq!(present(&Some(" PROD ".to_string())), Some("PROD"));
        assert_eq!(present(&None), None);
    }

    #[test]
    fn facets_are_sorted_and_distinct() {
        let row = |domain: &str, env: &str| -> FacetRow {
            (
                domain.to_string(),
                "High".to_string(),
                env.to_string(),
                "EU".to_string(),
                "cloud".to_string(),
                "Internal".to_string(),
                "Low".to_string(),
            )
        };
        let rows = vec![row("Risk", "PROD"), row("Payments", "UAT"), row("Risk", "DEV")];
        let facets = collect_facets(&rows, 2);

        assert_eq!(facets.domains, vec!["Payments", "Risk"]);
        assert_eq!(facets.environments, vec!["DEV", "PROD", "UAT"]);
        assert_eq!(facets.criticalities, vec!["High"]);
        assert_eq!(facets.total_count, 3);
        assert_eq!(facets.filtered_count, 2);
    }

    #[test]
    fn endpoint_names_fall_back_to_ids() {
        let names: HashMap<i64, String> = [(1, "Core Ledger".to_string())].into_iter().collect();
        let row = Integration {
            id: 10,
            source_app_id: 1,
            target_app_id: 7,
            integration_type: "API".to_string(),
            direction: "sync".to_string(),
            daily_volume: 5,
            data_sensitivity: "Low".to_string(),
            transport: "REST".to_string(),
            frequency: "daily".to_string(),
            interface_name: String::new(),
            create_date: None,
            write_date: None,
        };
        let views = with_names(vec![row], &names);
        assert_eq!(views[0].source_name, "Core Ledger");
        assert_eq!(views[0].target_name, "#7");
    }
}
