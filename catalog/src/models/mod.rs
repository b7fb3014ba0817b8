//! Portfolio data models.

pub mod application;
pub mod capability;
pub mod integration;
pub mod tech_debt;
