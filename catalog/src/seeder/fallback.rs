//! Local synthesis of integrations when the generator falls short.

use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use serde_json::{json, Value};

use super::pools;

fn pick<R: Rng + ?Sized>(pool: &'static [&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// `n` raw integration records between distinct members of `names`.
///
/// Returns nothing when fewer than two names are available.
pub fn fallback_integrations<R: Rng + ?Sized>(names: &[String], n: usize, rng: &mut R) -> Vec<Value> {
    if names.len() < 2 {
        return Vec::new();
    }

    (0..n)
        .filter_map(|_| {
            let mut ends = (0..names.len()).choose_multiple(rng, 2);
            ends.shuffle(rng);
            let (src, tgt) = (&names[*ends.first()?], &names[*ends.get(1)?]);
            Some(json!({
                "source_app_name": src,
                "target_app_name": tgt,
                "integration_type": pick(pools::INTEGRATION_TYPE, rng),
                "direction": pick(pools::DIRECTION, rng),
                "daily_volume": rng.gen_range(pools::VOLUME_RANGE),
                "data_sensitivity": pick(pools::SENSITIVITY, rng),
                "transport": pick(pools::TRANSPORTS, rng),
                "frequency": pick(pools::FREQUENCIES, rng),
                "interface_name": format!("{src} -> {tgt} interface"),
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeder::fields::{is_allowed, normalize_integration};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("App {i}")).collect()
    }

    #[test]
    fn too_few_names_yield_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(fallback_integrations(&[], 5, &mut rng).is_empty());
        assert!(fallback_integrations(&names(1), 5, &mut rng).is_empty());
    }

    #[test]
    fn records_join_distinct_known_apps() {
        let mut rng = StdRng::seed_from_u64(2);
        let pool = names(2);
        let records = fallback_integrations(&pool, 40, &mut rng);
        assert_eq!(records.len(), 40);

        for raw in &records {
            let draft = normalize_integration(raw, &mut rng);
            assert_ne!(draft.source_app_name, draft.target_app_name);
            assert!(pool.contains(&draft.source_app_name));
            assert!(pool.contains(&draft.target_app_name));
            assert!(pools::VOLUME_RANGE.contains(&draft.daily_volume));
            assert!(is_allowed("integration_type", &draft.integration_type));
            assert!(is_allowed("direction", &draft.direction));
            assert!(pools::TRANSPORTS.contains(&draft.transport.as_str()));
            assert_eq!(
                draft.interface_name,
                format!("{} -> {} interface", draft.source_app_name, draft.target_app_name)
            );
        }
    }

    #[test]
    fn both_directions_occur() {
        let mut rng = StdRng::seed_from_u64(3);
        let records = fallback_integrations(&names(2), 50, &mut rng);
        let forward = records.iter().filter(|r| r["source_app_name"] == "App 0").count();
        assert!(forward > 0 && forward < 50);
    }

    #[test]
    fn same_seed_same_records() {
        let a = fallback_integrations(&names(6), 10, &mut StdRng::seed_from_u64(9));
        let b = fallback_integrations(&names(6), 10, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
