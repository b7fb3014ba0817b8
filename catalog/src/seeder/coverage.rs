//! Post-persistence planning: capabilities, debt items, integration
//! resolution and ring closure.
//!
//! Everything here is pure; the orchestrator feeds in persisted state and
//! hands the planned rows back to the store.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use super::fields::{truncate_chars, IntegrationDraft};
use super::pools;
use crate::models::application::AppRef;
use crate::models::capability::CapabilityAssignment;
use crate::models::integration::NewIntegration;
use crate::models::tech_debt::NewTechDebtItem;

const DEBT_TITLE_MAX_LEN: usize = 140;
const INTERFACE_NAME_MAX_LEN: usize = 120;

/// Debt severity for a tech-debt score. Thresholds are inclusive.
pub fn severity_for_score(score: i32) -> &'static str {
    match score {
        s if s >= 80 => "Critical",
        s if s >= 60 => "High",
        s if s >= 30 => "Medium",
        _ => "Low",
    }
}

fn pick<R: Rng + ?Sized>(pool: &'static [&'static str], fallback: &'static str, rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or(fallback)
}

/// Two to five distinct capabilities per application.
pub fn plan_capabilities<R: Rng + ?Sized>(apps: &[AppRef], rng: &mut R) -> Vec<CapabilityAssignment> {
    apps.iter()
        .map(|app| {
            let k = rng.gen_range(2..=5);
            CapabilityAssignment {
                application_id: app.id,
                capabilities: pools::CAPABILITIES.choose_multiple(rng, k).copied().collect(),
            }
        })
        .collect()
}

/// One to four debt items per application, severity taken from its score.
pub fn plan_tech_debt<R: Rng + ?Sized>(
    apps: &[AppRef],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<NewTechDebtItem> {
    let mut items = Vec::new();
    for app in apps {
        let severity = severity_for_score(app.tech_debt_score);
        for k in 1..=rng.gen_range(1..=4) {
            let category = pick(pools::DEBT_CATEGORIES, "CodeQuality", rng);
            items.push(NewTechDebtItem {
                application_id: app.id,
                category: category.to_string(),
                severity: severity.to_string(),
                status: pick(pools::DEBT_STATUSES, "Open", rng).to_string(),
                title: truncate_chars(&format!("{category}: issue {k} in {}", app.name), DEBT_TITLE_MAX_LEN),
                description: format!("Auto-generated debt item for {}.", app.name),
                created_at: now,
                target_date: None,
            });
        }
    }
    items
}

/// Map endpoint names to application ids. Drafts with an unknown endpoint
/// or a self-loop are dropped and counted.
pub fn resolve_integrations(
    drafts: Vec<IntegrationDraft>,
    name_to_id: &HashMap<String, i64>,
) -> (Vec<NewIntegration>, usize) {
    let mut resolved = Vec::with_capacity(drafts.len());
    let mut skipped = 0;

    for draft in drafts {
        let source = name_to_id.get(&draft.source_app_name);
        let target = name_to_id.get(&draft.target_app_name);
        match (source, target) {
            (Some(&source), Some(&target)) if source != target => resolved.push(NewIntegration {
                source_app_id: source,
                target_app_id: target,
                integration_type: draft.integration_type,
                direction: draft.direction,
                daily_volume: draft.daily_volume,
                data_sensitivity: draft.data_sensitivity,
                transport: draft.transport,
                frequency: draft.frequency,
                interface_name: draft.interface_name,
            }),
            _ => skipped += 1,
        }
    }

    (resolved, skipped)
}

fn ring_edge<R: Rng + ?Sized>(from: &AppRef, to: &AppRef, rng: &mut R) -> NewIntegration {
    NewIntegration {
        source_app_id: from.id,
        target_app_id: to.id,
        integration_type: pick(pools::INTEGRATION_TYPE, "API", rng).to_string(),
        direction: pick(pools::DIRECTION, "async", rng).to_string(),
        daily_volume: rng.gen_range(pools::VOLUME_RANGE),
        data_sensitivity: pick(pools::SENSITIVITY, "Medium", rng).to_string(),
        transport: pick(pools::TRANSPORTS, "", rng).to_string(),
        frequency: pick(pools::FREQUENCIES, "", rng).to_string(),
        interface_name: truncate_chars(
            &format!("{} -> {} interface", from.name, to.name),
            INTERFACE_NAME_MAX_LEN,
        ),
    }
}

/// Edges that give every application at least one outbound and one inbound
/// integration.
///
/// `apps` are taken in the given order as a ring. Walking it, an application
/// with no outbound edge gets one to its successor, and one with no inbound
/// edge gets one from its predecessor. Edges planned earlier in the walk
/// count toward later checks. Fewer than two applications plan nothing.
pub fn plan_ring_closure<R: Rng + ?Sized>(
    apps: &[AppRef],
    edges: &[(i64, i64)],
    rng: &mut R,
) -> Vec<NewIntegration> {
    let n = apps.len();
    if n < 2 {
        return Vec::new();
    }

    let mut has_out: HashSet<i64> = edges.iter().map(|&(source, _)| source).collect();
    let mut has_in: HashSet<i64> = edges.iter().map(|&(_, target)| target).collect();
    let mut planned = Vec::new();

    for (i, app) in apps.iter().enumerate() {
        if !has_out.contains(&app.id) {
            let next = &apps[(i + 1) % n];
            planned.push(ring_edge(app, next, rng));
            has_out.insert(app.id);
            has_in.insert(next.id);
        }
        if !has_in.contains(&app.id) {
            let prev = &apps[(i + n - 1) % n];
            planned.push(ring_edge(prev, app, rng));
            has_out.insert(prev.id);
            has_in.insert(app.id);
        }
    }

    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeder::fields::is_allowed;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn app(id: i64, name: &str, score: i32) -> AppRef {
        AppRef {
            id,
            name: name.to_string(),
            tech_debt_score: score,
        }
    }

    fn apps(n: i64) -> Vec<AppRef> {
        (1..=n).map(|id| app(id, &format!("App {id}"), 50)).collect()
    }

    fn draft(source: &str, target: &str) -> IntegrationDraft {
        IntegrationDraft {
            source_app_name: source.to_string(),
            target_app_name: target.to_string(),
            integration_type: "API".to_string(),
            direction: "sync".to_string(),
            daily_volume: 10,
            data_sensitivity: "Low".to_string(),
            transport: "REST".to_string(),
            frequency: "daily".to_string(),
            interface_name: format!("{source} -> {target} interface"),
        }
    }

    fn assert_covered(apps: &[AppRef], edges: &[(i64, i64)]) {
        for app in apps {
            assert!(edges.iter().any(|&(s, _)| s == app.id), "{} has no outbound", app.name);
            assert!(edges.iter().any(|&(_, t)| t == app.id), "{} has no inbound", app.name);
        }
    }

    #[test]
    fn severity_thresholds() {
        assert_eq!(severity_for_score(85), "Critical");
        assert_eq!(severity_for_score(65), "High");
        assert_eq!(severity_for_score(30), "Medium");
        assert_eq!(severity_for_score(10), "Low");
        assert_eq!(severity_for_score(80), "Critical");
        assert_eq!(severity_for_score(79), "High");
        assert_eq!(severity_for_score(60), "High");
        assert_eq!(severity_for_score(59), "Medium");
        assert_eq!(severity_for_score(29), "Low");
        assert_eq!(severity_for_score(0), "Low");
    }

    #[test]
    fn capabilities_are_distinct_and_bounded() {
        let mut rng = StdRng::seed_from_u64(4);
        let plan = plan_capabilities(&apps(30), &mut rng);
        assert_eq!(plan.len(), 30);
        for assignment in &plan {
            let unique: HashSet<_> = assignment.capabilities.iter().collect();
            assert!((2..=5).contains(&assignment.capabilities.len()));
            assert_eq!(unique.len(), assignment.capabilities.len());
            assert!(assignment.capabilities.iter().all(|c| pools::CAPABILITIES.contains(c)));
        }
    }

    #[test]
    fn debt_items_follow_owner_score() {
        let mut rng = StdRng::seed_from_u64(5);
        let now = Utc::now();
        let owners = vec![app(1, "Core Ledger", 85), app(2, "Fraud Hub", 12)];
        let items = plan_tech_debt(&owners, now, &mut rng);

        for owner in &owners {
            let own: Vec<_> = items.iter().filter(|i| i.application_id == owner.id).collect();
            assert!((1..=4).contains(&own.len()));
            for (k, item) in own.iter().enumerate() {
                assert_eq!(item.severity, severity_for_score(owner.tech_debt_score));
                assert_eq!(item.title, format!("{}: issue {} in {}", item.category, k + 1, owner.name));
                assert_eq!(item.description, format!("Auto-generated debt item for {}.", owner.name));
                assert!(pools::DEBT_STATUSES.contains(&item.status.as_str()));
                assert_eq!(item.created_at, now);
                assert!(item.target_date.is_none());
            }
        }
    }

    #[test]
    fn long_debt_titles_are_truncated() {
        let mut rng = StdRng::seed_from_u64(6);
        let owner = app(1, &"N".repeat(200), 40);
        let items = plan_tech_debt(&[owner], Utc::now(), &mut rng);
        assert!(items.iter().all(|i| i.title.chars().count() <= DEBT_TITLE_MAX_LEN));
    }

    #[test]
    fn unknown_and_self_loop_drafts_are_skipped() {
        let name_to_id: HashMap<String, i64> =
            [("A".to_string(), 1), ("B".to_string(), 2)].into_iter().collect();
        let drafts = vec![draft("A", "B"), draft("A", "A"), draft("A", "Ghost"), draft("", "B")];

        let (resolved, skipped) = resolve_integrations(drafts, &name_to_id);
        assert_eq!(skipped, 3);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].upsert_key(), (1, 2, "API"));
        assert_eq!(resolved[0].interface_name, "A -> B interface");
    }

    #[test]
    fn ring_covers_isolated_apps() {
        let mut rng = StdRng::seed_from_u64(7);
        let ring = apps(5);
        let planned = plan_ring_closure(&ring, &[], &mut rng);
        let edges: Vec<(i64, i64)> = planned.iter().map(|e| (e.source_app_id, e.target_app_id)).collect();

        assert_covered(&ring, &edges);
        assert!(edges.iter().all(|(s, t)| s != t));
        assert_eq!(edges, vec![(1, 2), (5, 1), (2, 3), (3, 4), (4, 5)]);
    }

    #[test]
    fn ring_fills_only_missing_degrees() {
        let mut rng = StdRng::seed_from_u64(8);
        let ring = apps(4);
        let existing = vec![(1, 2), (2, 1), (3, 1)];
        let planned = plan_ring_closure(&ring, &existing, &mut rng);

        let mut edges = existing.clone();
        edges.extend(planned.iter().map(|e| (e.source_app_id, e.target_app_id)));
        assert_covered(&ring, &edges);
        assert_eq!(planned.len(), 3);
    }

    #[test]
    fn covered_ring_plans_nothing() {
        let mut rng = StdRng::seed_from_u64(9);
        let existing = vec![(1, 2), (2, 3), (3, 1)];
        assert!(plan_ring_closure(&apps(3), &existing, &mut rng).is_empty());
    }

    #[test]
    fn ring_needs_two_apps() {
        let mut rng = StdRng::seed_from_u64(10);
        assert!(plan_ring_closure(&apps(1), &[], &mut rng).is_empty());
        assert!(plan_ring_closure(&[], &[], &mut rng).is_empty());
    }

    #[test]
    fn ring_edges_use_pooled_values() {
        let mut rng = StdRng::seed_from_u64(11);
        for edge in plan_ring_closure(&apps(6), &[], &mut rng) {
            assert!(is_allowed("integration_type", &edge.integration_type));
            assert!(is_allowed("direction", &edge.direction));
            assert!(is_allowed("data_sensitivity", &edge.data_sensitivity));
            assert!(pools::VOLUME_RANGE.contains(&edge.daily_volume));
            assert!(pools::FREQUENCIES.contains(&edge.frequency.as_str()));
        }
    }
}
