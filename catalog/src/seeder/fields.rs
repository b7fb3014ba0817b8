//! Declarative field schema and the normalizer that enforces it.
//!
//! Every generated record passes through [`normalize`] with one of the
//! field tables below. Whatever the generator produced, the result holds
//! only allowed enumerated values, bounded text and clamped numbers, so
//! persisted rows are schema-valid by construction.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

use super::pools;
use crate::models::application::NewApplication;

/// Where a missing value comes from.
#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Fixed(&'static str),
    /// One random member of the pool.
    Pick(&'static [&'static str]),
    /// A random subset of `min..=max` distinct members, joined with ", ".
    Sample {
        pool: &'static [&'static str],
        min: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    /// Case-exact member of `allowed`, else `fallback`.
    Choice {
        allowed: &'static [&'static str],
        fallback: &'static str,
    },
    /// Single line: whitespace collapsed, at most `max_len` characters.
    Line { max_len: usize, fallback: Fallback },
    /// Free text: trimmed, at most `max_len` characters.
    Text { max_len: usize, fallback: Fallback },
    /// Integer clamped into 0..=100, 0 when missing or malformed.
    Score,
    /// Non-negative integer, 0 when missing or malformed.
    Volume,
    /// Single line computed from earlier fields when the raw value is missing.
    Derived {
        max_len: usize,
        derive: fn(&NormalizedRecord) -> String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rule: FieldRule,
}

const fn field(name: &'static str, rule: FieldRule) -> FieldSpec {
    FieldSpec { name, rule }
}

const fn line(max_len: usize, fallback: Fallback) -> FieldRule {
    FieldRule::Line { max_len, fallback }
}

const fn choice(allowed: &'static [&'static str], fallback: &'static str) -> FieldRule {
    FieldRule::Choice { allowed, fallback }
}

pub const NAME_MAX_LEN: usize = 200;

pub const APPLICATION_FIELDS: &[FieldSpec] = &[
    field("name", line(NAME_MAX_LEN, Fallback::Fixed("Unnamed App"))),
    field("domain", line(100, Fallback::Fixed("General"))),
    field("criticality", choice(pools::CRITICALITY, "Medium")),
    field("lifecycle", choice(pools::LIFECYCLE, "Active")),
    field("environment", choice(pools::ENVIRONMENT, "UAT")),
    field("region", line(100, Fallback::Fixed("EU"))),
    field("hosting", choice(pools::HOSTING, "hybrid")),
    field(
        "tech_stack",
        FieldRule::Text {
            max_len: 2000,
            fallback: Fallback::Fixed("N/A"),
        },
    ),
    field("runtime", line(100, Fallback::Fixed("N/A"))),
    field("vendor", line(100, Fallback::Fixed("Internal"))),
    field("data_sensitivity", choice(pools::SENSITIVITY, "Medium")),
    field("tech_debt_score", FieldRule::Score),
    field("business_owner", line(120, Fallback::Pick(pools::BUSINESS_OWNERS))),
    field("it_owner", line(120, Fallback::Pick(pools::IT_OWNERS))),
    field(
        "database_technology",
        line(120, Fallback::Pick(pools::DB_TECHNOLOGIES)),
    ),
    field(
        "vendor_products",
        FieldRule::Text {
            max_len: 500,
            fallback: Fallback::Sample {
                pool: pools::VENDOR_PRODUCTS,
                min: 1,
                max: 3,
            },
        },
    ),
];

pub const INTEGRATION_FIELDS: &[FieldSpec] = &[
    field("source_app_name", line(NAME_MAX_LEN, Fallback::Fixed(""))),
    field("target_app_name", line(NAME_MAX_LEN, Fallback::Fixed(""))),
    field("integration_type", choice(pools::INTEGRATION_TYPE, "API")),
    field("direction", choice(pools::DIRECTION, "async")),
    field("daily_volume", FieldRule::Volume),
    field("data_sensitivity", choice(pools::SENSITIVITY, "Medium")),
    field("transport", line(80, Fallback::Pick(pools::TRANSPORTS))),
    field("frequency", line(80, Fallback::Pick(pools::FREQUENCIES))),
    field(
        "interface_name",
        FieldRule::Derived {
            max_len: 120,
            derive: interface_label,
        },
    ),
];

fn interface_label(record: &NormalizedRecord) -> String {
    format!(
        "{} -> {} interface",
        record.text("source_app_name"),
        record.text("target_app_name")
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
}

/// Normalized field values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    values: BTreeMap<&'static str, FieldValue>,
}

impl NormalizedRecord {
    pub fn text(&self, name: &str) -> String {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => s.clone(),
            Some(FieldValue::Int(n)) => n.to_string(),
            None => String::new(),
        }
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(FieldValue::Int(n)) => *n,
            Some(FieldValue::Text(s)) => s.parse().unwrap_or(0),
            None => 0,
        }
    }
}

/// An integration record that still names its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationDraft {
    pub source_app_name: String,
    pub target_app_name: String,
    pub integration_type: String,
    pub direction: String,
    pub daily_volume: i64,
    pub data_sensitivity: String,
    pub transport: String,
    pub frequency: String,
    pub interface_name: String,
}

/// Apply a field table to one raw record. Non-object input yields all fallbacks.
pub fn normalize<R: Rng + ?Sized>(
    raw: &Value,
    specs: &[FieldSpec],
    rng: &mut R,
) -> NormalizedRecord {
    let mut record = NormalizedRecord::default();
    for spec in specs {
        let value = raw.get(spec.name);
        let normalized = match spec.rule {
            FieldRule::Choice { allowed, fallback } => {
                let text = raw_text(value)
                    .filter(|s| allowed.contains(&s.as_str()))
                    .unwrap_or_else(|| fallback.to_string());
                FieldValue::Text(text)
            }
            FieldRule::Line { max_len, fallback } => FieldValue::Text(
                raw_text(value)
                    .map(|s| clean_line(&s, max_len))
                    .unwrap_or_else(|| resolve_fallback(fallback, rng)),
            ),
            FieldRule::Text { max_len, fallback } => FieldValue::Text(
                raw_text(value)
                    .map(|s| truncate_chars(&s, max_len))
                    .unwrap_or_else(|| resolve_fallback(fallback, rng)),
            ),
            FieldRule::Score => FieldValue::Int(parse_integer(value).unwrap_or(0).clamp(0, 100)),
            FieldRule::Volume => FieldValue::Int(parse_integer(value).unwrap_or(0).max(0)),
            FieldRule::Derived { max_len, derive } => {
                let text = raw_text(value).unwrap_or_else(|| derive(&record));
                FieldValue::Text(clean_line(&text, max_len))
            }
        };
        record.values.insert(spec.name, normalized);
    }
    record
}

pub fn normalize_application<R: Rng + ?Sized>(raw: &Value, rng: &mut R) -> NewApplication {
    let r = normalize(raw, APPLICATION_FIELDS, rng);
    NewApplication {
        name: r.text("name"),
        domain: r.text("domain"),
        criticality: r.text("criticality"),
        lifecycle: r.text("lifecycle"),
        environment: r.text("environment"),
        region: r.text("region"),
        hosting: r.text("hosting"),
        business_owner: r.text("business_owner"),
        it_owner: r.text("it_owner"),
        vendor: r.text("vendor"),
        tech_stack: r.text("tech_stack"),
        runtime: r.text("runtime"),
        database_technology: r.text("database_technology"),
        vendor_products: r.text("vendor_products"),
        data_sensitivity: r.text("data_sensitivity"),
        tech_debt_score: r.int("tech_debt_score") as i32,
    }
}

pub fn normalize_integration<R: Rng + ?Sized>(raw: &Value, rng: &mut R) -> IntegrationDraft {
    let r = normalize(raw, INTEGRATION_FIELDS, rng);
    IntegrationDraft {
        source_app_name: r.text("source_app_name"),
        target_app_name: r.text("target_app_name"),
        integration_type: r.text("integration_type"),
        direction: r.text("direction"),
        daily_volume: r.int("daily_volume"),
        data_sensitivity: r.text("data_sensitivity"),
        transport: r.text("transport"),
        frequency: r.text("frequency"),
        interface_name: r.text("interface_name"),
    }
}

/// Case- and whitespace-insensitive identity of a generated application.
pub fn application_key(raw: &Value) -> Option<String> {
    raw_text(raw.get("name")).map(|name| clean_line(&name, NAME_MAX_LEN).to_lowercase())
}

/// Display form of a generated application's name, if it has one.
pub fn application_name(raw: &Value) -> Option<String> {
    raw_text(raw.get("name")).map(|name| clean_line(&name, NAME_MAX_LEN))
}

/// Whether `value` is allowed for an enumerated field of either table.
pub fn is_allowed(field_name: &str, value: &str) -> bool {
    APPLICATION_FIELDS
        .iter()
        .chain(INTEGRATION_FIELDS)
        .filter(|spec| spec.name == field_name)
        .any(|spec| match spec.rule {
            FieldRule::Choice { allowed, .. } => allowed.contains(&value),
            _ => true,
        })
}

/// Trimmed string form of a raw value; `None` for absent, null or blank.
fn raw_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_integer(value: Option<&Value>) -> Option<i64> {
    let from_float = |f: f64| f.is_finite().then_some(f.trunc() as i64);
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    }
}

fn clean_line(text: &str, max_len: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max_len)
}

pub(crate) fn truncate_chars(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect::<String>().trim_end().to_string()
}

fn resolve_fallback<R: Rng + ?Sized>(fallback: Fallback, rng: &mut R) -> String {
    match fallback {
        Fallback::Fixed(s) => s.to_string(),
        Fallback::Pick(pool) => pool.choose(rng).copied().unwrap_or_default().to_string(),
        Fallback::Sample { pool, min, max } => {
            let k = rng.gen_range(min..=max).min(pool.len());
            pool.choose_multiple(rng, k)
                .copied()
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
