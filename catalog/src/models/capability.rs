//! Capability: named business capability tag shared by applications.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{application_capabilities, capabilities};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = capabilities)]
pub struct Capability {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = capabilities)]
pub struct NewCapability<'a> {
    pub name: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = application_capabilities)]
pub struct NewApplicationCapability {
    pub application_id: i64,
    pub capability_id: i64,
}

/// The full capability set an application should carry after seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityAssignment {
    pub application_id: i64,
    pub capabilities: Vec<&'static str>,
}
