//! Integration: directed data flow between two applications.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::integrations;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = integrations)]
pub struct Integration {
    pub id: i64,
    pub source_app_id: i64,
    pub target_app_id: i64,
    pub integration_type: String,
    pub direction: String,
    pub daily_volume: i64,
    pub data_sensitivity: String,
    pub transport: String,
    pub frequency: String,
    pub interface_name: String,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

/// Integration row keyed for upsert by (source, target, integration_type).
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset, Serialize, Deserialize)]
#[diesel(table_name = integrations)]
pub struct NewIntegration {
    pub source_app_id: i64,
    pub target_app_id: i64,
    pub integration_type: String,
    pub direction: String,
    pub daily_volume: i64,
    pub data_sensitivity: String,
    pub transport: String,
    pub frequency: String,
    pub interface_name: String,
}

impl NewIntegration {
    pub fn upsert_key(&self) -> (i64, i64, &str) {
        (self.source_app_id, self.target_app_id, &self.integration_type)
    }
}
