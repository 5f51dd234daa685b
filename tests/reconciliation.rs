// =============================================================================
// Propriétés de bout en bout de la réconciliation
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use proptest::prelude::*;

use segzone::config::SegzoneConfig;
use segzone::{
    apply_proportions, collapse_to_match, derive_proportions, expand_to_match,
    find_common_zoning, is_strict_aggregation, match_target_total, rebalance_zone_totals,
    replace_segment_combination, translate_to_common_zoning, DesiredTotals, MatchMode,
    ReconcileError, Segment, SegmentedArray, Segmentation, SplitMethod, Translation,
    ZoneSystemRegistry, ZoningSystem,
};

/// lsoa (6) → msoa (3) → lad (2), plus un zonage isolé
fn registry() -> ZoneSystemRegistry {
    let mut registry = ZoneSystemRegistry::new();
    let lsoa = registry.register(ZoningSystem::new("lsoa", ["l1", "l2", "l3", "l4", "l5", "l6"]).unwrap()).unwrap();
    let msoa = registry.register(ZoningSystem::new("msoa", ["m1", "m2", "m3"]).unwrap()).unwrap();
    let lad = registry.register(ZoningSystem::new("lad", ["a", "b"]).unwrap()).unwrap();
    registry.register(ZoningSystem::new("ward", ["w1", "w2"]).unwrap()).unwrap();

    registry.register_translation(Translation::from_lookup(&lsoa, &msoa, &[
        ("l1", "m1"), ("l2", "m1"), ("l3", "m2"), ("l4", "m2"), ("l5", "m3"), ("l6", "m3"),
    ]).unwrap()).unwrap();
    registry.register_translation(Translation::from_lookup(&msoa, &lad, &[
        ("m1", "a"), ("m2", "a"), ("m3", "b"),
    ]).unwrap()).unwrap();
    registry
}

fn two_zones() -> Arc<ZoningSystem> {
    Arc::new(ZoningSystem::new("study", ["Z1", "Z2"]).unwrap())
}

fn h() -> Segment {
    Segment::with_codes("h", 1..=5)
}

fn age() -> Segment {
    Segment::with_codes("age", 1..=9)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn arrays_close(a: &SegmentedArray, b: &SegmentedArray) -> bool {
    a.keys() == b.keys()
        && a.data().iter().zip(b.data().iter()).all(|(x, y)| close(*x, *y))
}

// -----------------------------------------------------------------------------
// Zonages
// -----------------------------------------------------------------------------

#[test]
fn test_aggregation_is_transitive_through_chain() {
    let registry = registry();
    let lad = registry.get("lad").unwrap();
    let msoa = registry.get("msoa").unwrap();
    let lsoa = registry.get("lsoa").unwrap();

    assert!(is_strict_aggregation(&registry, &msoa, &lsoa).unwrap());
    assert!(is_strict_aggregation(&registry, &lad, &msoa).unwrap());
    assert!(is_strict_aggregation(&registry, &lad, &lsoa).unwrap());
    assert!(is_strict_aggregation(&registry, &lsoa, &lad).is_err());
}

#[test]
fn test_common_zoning_is_coarsest() {
    let registry = registry();
    let systems: Vec<Arc<ZoningSystem>> = ["msoa", "lsoa", "lad"].iter()
        .map(|n| registry.get(n).unwrap())
        .collect();
    assert_eq!(find_common_zoning(&registry, &systems).unwrap().name, "lad");

    let with_ward = vec![registry.get("lsoa").unwrap(), registry.get("ward").unwrap()];
    assert!(matches!(
        find_common_zoning(&registry, &with_ward),
        Err(ReconcileError::IncompatibleZoning { .. })
    ));
}

#[test]
fn test_translation_to_common_zoning_preserves_totals() {
    let registry = registry();
    let seg = Segmentation::new(vec![Segment::with_codes("h", 1..=2)]).unwrap();
    let fine = SegmentedArray::from_fn(seg.clone(), registry.get("lsoa").unwrap(), |key, _| key[0] as f64);
    let coarse = SegmentedArray::filled(seg, registry.get("lad").unwrap(), 3.0);

    let out = translate_to_common_zoning(&registry, &[fine.clone(), coarse.clone()]).unwrap();
    assert!(out.iter().all(|a| a.zoning().name == "lad"));
    assert!(close(out[0].total(), fine.total()));
    assert_eq!(out[0].get(&[2], "a").unwrap(), 8.0);
    assert_eq!(out[1], coarse);
}

// -----------------------------------------------------------------------------
// Segmentations
// -----------------------------------------------------------------------------

#[test]
fn test_end_to_end_collapse_then_split() {
    let h_age = Segmentation::new(vec![h(), age()]).unwrap();
    let only_h = Segmentation::new(vec![h()]).unwrap();
    let ones = SegmentedArray::filled(h_age.clone(), two_zones(), 1.0);

    let collapsed = collapse_to_match(&ones, &only_h, true).unwrap();
    assert!(collapsed.data().iter().all(|v| *v == 9.0));

    let restored = expand_to_match(&collapsed, &h_age, SplitMethod::Split).unwrap();
    assert!(arrays_close(&restored, &ones));
}

#[test]
fn test_duplicate_round_trip_multiplies_by_cardinality() {
    let only_h = Segmentation::new(vec![h()]).unwrap();
    let h_age = Segmentation::new(vec![h(), age()]).unwrap();
    let base = SegmentedArray::from_fn(only_h.clone(), two_zones(), |key, _| key[0] as f64 * 1.5);

    let duplicated = expand_to_match(&base, &h_age, SplitMethod::Duplicate).unwrap();
    let back = collapse_to_match(&duplicated, &only_h, true).unwrap();
    assert!(arrays_close(&back, &base.scale(9.0)));
}

#[test]
fn test_expand_rejects_non_subset() {
    let gender = Segmentation::new(vec![Segment::with_codes("gender", 1..=2)]).unwrap();
    let h_age = Segmentation::new(vec![h(), age()]).unwrap();
    let array = SegmentedArray::filled(gender, two_zones(), 1.0);
    assert!(matches!(
        expand_to_match(&array, &h_age, SplitMethod::Split),
        Err(ReconcileError::SegmentationMismatch { .. })
    ));
}

#[test]
fn test_proportions_sum_to_one_or_zero() {
    let ns_sec = Segment::with_codes("ns_sec", 1..=5);
    let source_seg = Segmentation::new(vec![h(), ns_sec]).unwrap();
    let source = SegmentedArray::from_fn(source_seg, two_zones(), |key, zone| {
        if key[0] == 5 && zone == "Z2" { 0.0 } else { (key[0] + key[1]) as f64 }
    });
    let only_h = Segmentation::new(vec![h()]).unwrap();

    let proportions = derive_proportions(&source, &only_h).unwrap();
    let sums = collapse_to_match(&proportions, &only_h, true).unwrap();
    for key in sums.keys() {
        for zone in ["Z1", "Z2"] {
            let s = sums.get(key, zone).unwrap();
            let expected = if key[0] == 5 && zone == "Z2" { 0.0 } else { 1.0 };
            assert!(close(s, expected), "{:?}/{} = {}", key, zone, s);
        }
    }

    let target = SegmentedArray::filled(only_h.clone(), two_zones(), 50.0);
    let applied = apply_proportions(&source, &target).unwrap();
    assert!(close(applied.total(), 50.0 * 9.0));
}

// -----------------------------------------------------------------------------
// Totaux
// -----------------------------------------------------------------------------

#[test]
fn test_rebalancer_is_exact_and_share_preserving() {
    let seg = Segmentation::new(vec![h()]).unwrap();
    let mut array = SegmentedArray::from_fn(seg, two_zones(), |key, zone| {
        key[0] as f64 * if zone == "Z1" { 1.0 } else { 3.0 }
    });
    let before = array.clone();
    let targets = HashMap::from([("Z1".to_string(), 1234.5), ("Z2".to_string(), 0.25)]);
    rebalance_zone_totals(&mut array, DesiredTotals::Zones(&targets)).unwrap();

    let totals = array.zone_totals();
    assert!(close(totals["Z1"], 1234.5));
    assert!(close(totals["Z2"], 0.25));
    let before_totals = before.zone_totals();
    for key in array.keys() {
        for zone in ["Z1", "Z2"] {
            let share_before = before.get(key, zone).unwrap() / before_totals[zone];
            let share_after = array.get(key, zone).unwrap() / totals[zone];
            assert!(close(share_before, share_after));
        }
    }
}

#[test]
fn test_uniform_list_is_unchanged_by_total_matcher() {
    let seg = Segmentation::new(vec![h()]).unwrap();
    let a = SegmentedArray::from_fn(seg, two_zones(), |key, _| key[0] as f64);
    let out = match_target_total(&[a.clone(), a.clone()]);
    assert_eq!(out, vec![a.clone(), a]);
}

// -----------------------------------------------------------------------------
// Masques
// -----------------------------------------------------------------------------

#[test]
fn test_mask_and_versus_or() {
    let seg = Segmentation::new(vec![
        Segment::with_codes("age", 1..=2),
        Segment::with_codes("gender", 1..=2),
    ]).unwrap();
    let array = SegmentedArray::from_fn(seg, two_zones(), |key, zone| {
        (10 * key[0] + key[1]) as f64 + if zone == "Z2" { 0.5 } else { 0.0 }
    });
    let combination = BTreeMap::from([
        ("age".to_string(), vec![1]),
        ("gender".to_string(), vec![2]),
    ]);

    let all = replace_segment_combination(&array, &combination, -1.0, MatchMode::All, true).unwrap();
    let any = replace_segment_combination(&array, &combination, -1.0, MatchMode::Any, true).unwrap();
    for key in array.keys() {
        for zone in ["Z1", "Z2"] {
            let original = array.get(key, zone).unwrap();
            let in_and = key[0] == 1 && key[1] == 2;
            let in_or = key[0] == 1 || key[1] == 2;
            assert_eq!(all.get(key, zone).unwrap(), if in_and { -1.0 } else { original });
            assert_eq!(any.get(key, zone).unwrap(), if in_or { -1.0 } else { original });
        }
    }
}

// -----------------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------------

#[test]
fn test_demo_configuration_is_consistent() {
    let content = include_str!("../segzone.toml");
    let config = SegzoneConfig::from_toml_str(content).unwrap();
    segzone::config::validate_config(&config).unwrap();

    let registry = config.build_registry().unwrap();
    let lad = registry.get("lad").unwrap();
    let lsoa = registry.get("lsoa").unwrap();
    assert!(is_strict_aggregation(&registry, &lad, &lsoa).unwrap());

    let age_emp = config.segmentation(&["age", "pop_emp"]).unwrap();
    assert_eq!(age_emp.keys().len(), 9 * 4 - 3 * 2);

    segzone::demo::run(&config).unwrap();
}

// -----------------------------------------------------------------------------
// Propriétés
// -----------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_split_round_trip(values in prop::collection::vec(0.0f64..1e6, 10)) {
        let only_h = Segmentation::new(vec![h()]).unwrap();
        let h_age = Segmentation::new(vec![h(), age()]).unwrap();
        let mut rows = values.iter();
        let base = SegmentedArray::from_fn(only_h.clone(), two_zones(), |_, _| {
            rows.next().copied().unwrap_or_default()
        });

        let split = expand_to_match(&base, &h_age, SplitMethod::Split).unwrap();
        prop_assert!(close(split.total(), base.total()));
        let back = collapse_to_match(&split, &only_h, true).unwrap();
        prop_assert!(arrays_close(&back, &base));
    }

    #[test]
    fn prop_rebalance_hits_targets(
        values in prop::collection::vec(0.1f64..1e4, 10),
        z1 in 0.0f64..1e7,
        z2 in 0.0f64..1e7,
    ) {
        let seg = Segmentation::new(vec![h()]).unwrap();
        let mut rows = values.iter();
        let mut array = SegmentedArray::from_fn(seg, two_zones(), |_, _| {
            rows.next().copied().unwrap_or_default()
        });
        let before = array.clone();
        let targets = HashMap::from([("Z1".to_string(), z1), ("Z2".to_string(), z2)]);
        rebalance_zone_totals(&mut array, DesiredTotals::Zones(&targets)).unwrap();

        let totals = array.zone_totals();
        prop_assert!(close(totals["Z1"], z1));
        prop_assert!(close(totals["Z2"], z2));
        if z1 > 0.0 {
            let b = before.zone_totals();
            for key in array.keys() {
                prop_assert!(close(
                    before.get(key, "Z1").unwrap() / b["Z1"],
                    array.get(key, "Z1").unwrap() / z1,
                ));
            }
        }
    }
}
