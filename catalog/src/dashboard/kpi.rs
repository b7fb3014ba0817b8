//! KPI queries for the portfolio dashboard and LLM context.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Int4, Int8, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

/// Column the grouped counts may run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Domain,
    Criticality,
    Environment,
}

impl Dimension {
    fn column(self) -> &'static str {
        match self {
            Dimension::Domain => "domain",
            Dimension::Criticality => "criticality",
            Dimension::Environment => "environment",
        }
    }
}

/// Application count for one value of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, QueryableByName)]
pub struct LabelCount {
    #[diesel(sql_type = Text)]
    pub label: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

#[derive(Debug, Serialize, QueryableByName)]
struct PortfolioTotals {
    #[diesel(sql_type = BigInt)]
    total: i64,
    #[diesel(sql_type = Double)]
    avg_debt: f64,
}

/// Highest-debt application row.
#[derive(Debug, Clone, Serialize, QueryableByName)]
pub struct DebtLeader {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Text)]
    pub domain: String,
    #[diesel(sql_type = Text)]
    pub criticality: String,
    #[diesel(sql_type = Int4)]
    pub tech_debt_score: i32,
}

/// Identifying fields of an application, as handed to the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, QueryableByName)]
pub struct AppSummary {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub name: String,
    #[diesel(sql_type = Text)]
    pub domain: String,
    #[diesel(sql_type = Text)]
    pub criticality: String,
    #[diesel(sql_type = Text)]
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_apps: i64,
    /// Mean tech-debt score rounded to one decimal; 0 for an empty portfolio.
    pub avg_debt: f64,
    pub by_criticality: Vec<LabelCount>,
    pub by_environment: Vec<LabelCount>,
    pub top_debt: Vec<DebtLeader>,
}

/// Aggregates handed to the LLM instead of the full portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioOverview {
    pub total_apps: i64,
    pub by_domain: Vec<LabelCount>,
    pub by_criticality: Vec<LabelCount>,
    pub by_environment: Vec<LabelCount>,
    pub sample_apps: Vec<AppSummary>,
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

async fn query_totals(conn: &mut AsyncPgConnection) -> anyhow::Result<PortfolioTotals> {
    let totals = diesel::sql_query(
        "SELECT \
            COUNT(*) AS total, \
            COALESCE(AVG(tech_debt_score), 0)::float8 AS avg_debt \
         FROM applications",
    )
    .get_result(conn)
    .await?;
    Ok(totals)
}

/// Application counts per value of `dimension`, largest first.
pub async fn query_counts(
    conn: &mut AsyncPgConnection,
    dimension: Dimension,
    limit: Option<i64>,
) -> anyhow::Result<Vec<LabelCount>> {
    let column = dimension.column();
    let limit = limit.map(|n| format!(" LIMIT {}", n.max(0))).unwrap_or_default();
    let results = diesel::sql_query(format!(
        "SELECT COALESCE(NULLIF({column}, ''), 'N/A') AS label, COUNT(*) AS count \
         FROM applications \
         GROUP BY label \
         ORDER BY count DESC, label ASC{limit}"
    ))
    .load(conn)
    .await?;
    Ok(results)
}

pub async fn query_top_debt(
    conn: &mut AsyncPgConnection,
    limit: i64,
) -> anyhow::Result<Vec<DebtLeader>> {
    let results = diesel::sql_query(
        "SELECT id, name, domain, criticality, tech_debt_score \
         FROM applications \
         ORDER BY tech_debt_score DESC, id ASC \
         LIMIT $1",
    )
    .bind::<BigInt, _>(limit)
    .load(conn)
    .await?;
    Ok(results)
}

pub async fn query_sample(
    conn: &mut AsyncPgConnection,
    limit: i64,
) -> anyhow::Result<Vec<AppSummary>> {
    let results = diesel::sql_query(
        "SELECT id, name, domain, criticality, environment \
         FROM applications \
         ORDER BY id ASC \
         LIMIT $1",
    )
    .bind::<BigInt, _>(limit)
    .load(conn)
    .await?;
    Ok(results)
}

pub async fn dashboard_stats(conn: &mut AsyncPgConnection) -> anyhow::Result<DashboardStats> {
    let totals = query_totals(conn).await?;
    Ok(DashboardStats {
        total_apps: totals.total,
        avg_debt: round_one_decimal(totals.avg_debt),
        by_criticality: query_counts(conn, Dimension::Criticality, None).await?,
        by_environment: query_counts(conn, Dimension::Environment, None).await?,
        top_debt: query_top_debt(conn, 5).await?,
    })
}

/// Top `top_n` counts per dimension plus the first `sample_n` applications.
pub async fn portfolio_overview(
    conn: &mut AsyncPgConnection,
    top_n: i64,
    sample_n: i64,
) -> anyhow::Result<PortfolioOverview> {
    let totals = query_totals(conn).await?;
    Ok(PortfolioOverview {
        total_apps: totals.total,
        by_domain: query_counts(conn, Dimension::Domain, Some(top_n)).await?,
        by_criticality: query_counts(conn, Dimension::Criticality, Some(top_n)).await?,
        by_environment: query_counts(conn, Dimension::Environment, Some(top_n)).await?,
        sample_apps: query_sample(conn, sample_n).await?,
    })
}

impl std::fmt::Display for DashboardStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Applications: {}", self.total_apps)?;
        writeln!(f, "Average tech debt: {:.1}", self.avg_debt)?;
        for (title, counts) in [
            ("By criticality", &self.by_criticality),
            ("By environment", &self.by_environment),
        ] {
            writeln!(f, "{title}:")?;
            for c in counts {
                writeln!(f, "  {:<16} {}", c.label, c.count)?;
            }
        }
        writeln!(f, "Top tech debt:")?;
        for app in &self.top_debt {
            writeln!(
                f,
                "  [{}] {} ({}, {}) score {}",
                app.id, app.name, app.domain, app.criticality, app.tech_debt_score
            )?;
        }
        Ok(())
    }
}
