//! Catalog services: read queries and integration maintenance.

pub mod catalog_service;
