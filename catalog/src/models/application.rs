//! Application: one system in the bank's application landscape.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::applications;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = applications)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub criticality: String,
    pub lifecycle: String,
    pub environment: String,
    pub region: String,
    pub hosting: String,
    pub business_owner: String,
    pub it_owner: String,
    pub vendor: String,
    pub tech_stack: String,
    pub runtime: String,
    pub database_technology: String,
    pub vendor_products: String,
    pub data_sensitivity: String,
    pub tech_debt_score: i32,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

/// A fully normalized application, written by name-keyed upsert.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub name: String,
    pub domain: String,
    pub criticality: String,
    pub lifecycle: String,
    pub environment: String,
    pub region: String,
    pub hosting: String,
    pub business_owner: String,
    pub it_owner: String,
    pub vendor: String,
    pub tech_stack: String,
    pub runtime: String,
    pub database_technology: String,
    pub vendor_products: String,
    pub data_sensitivity: String,
    pub tech_debt_score: i32,
}

/// Identity and score of a stored application, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize)]
pub struct AppRef {
    pub id: i64,
    pub name: String,
    pub tech_debt_score: i32,
}
