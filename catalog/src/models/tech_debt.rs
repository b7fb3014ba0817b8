//! Tech debt item: a tracked remediation need owned by one application.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::tech_debt_items;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tech_debt_items)]
pub struct TechDebtItem {
    pub id: i64,
    pub application_id: i64,
    pub category: String,
    pub severity: String,
    pub status: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Insertable, Serialize, Deserialize)]
#[diesel(table_name = tech_debt_items)]
pub struct NewTechDebtItem {
    pub application_id: i64,
    pub category: String,
    pub severity: String,
    pub status: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub target_date: Option<NaiveDate>,
}
