// =============================================================================
// DEMO — Pipeline de démonstration sur la chaîne LSOA ⊂ MSOA ⊂ LAD
// =============================================================================
//
// Le pipeline déroule toutes les opérations du cœur à partir d'une
// configuration (segments, zonages, correspondances) :
//   1. Registre des zonages
//   2. Zonage commun et traduction
//   3. Réduction puis ré-expansion d'une segmentation {h, age}
//   4. Ventilation d'une population selon des proportions
//   5. Recalage sur des totaux de contrôle
//   6. Réécriture d'une combinaison de segments
//
// Le binaire `segzone` n'en est que l'enveloppe (chargement + logs).
//
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::info;

use crate::config::{ConfigResult, SegzoneConfig};
use crate::core::array::SegmentedArray;
use crate::core::compat::{find_common_zoning, is_strict_aggregation, translate_to_common_zoning};
use crate::core::error::ReconcileError;
use crate::core::mask::{replace_segment_combination, MatchMode};
use crate::core::migrate::{collapse_to_match, expand_to_match, SplitMethod};
use crate::core::proportion::apply_proportions;
use crate::core::rebalance::{match_target_total, rebalance_zone_totals, DesiredTotals};
use crate::core::validate;

/// Déroule la démonstration complète ; la moindre erreur l'interrompt.
pub fn run(config: &SegzoneConfig) -> ConfigResult<()> {
    println!("╔══════════════════════════════════════════════════╗");
    println!("║      SEGZONE — Réconciliation zonale segmentée   ║");
    println!("╚══════════════════════════════════════════════════╝\n");

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 1 : Registre des zonages
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 1 : Zonages et correspondances ═══\n");

    let registry = config.build_registry()?;
    let lad = registry.get("lad")?;
    let msoa = registry.get("msoa")?;
    let lsoa = registry.get("lsoa")?;
    for zoning in [&lsoa, &msoa, &lad] {
        println!("{}", zoning);
    }
    info!(zonings = registry.zoning_names().len(), tolerance = registry.tolerance(), "registre prêt");

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 2 : Zonage commun
    // ═══════════════════════════════════════════════════════════
    println!("\n═══ ÉTAPE 2 : Zonage commun ═══\n");

    println!("lad agrège lsoa : {}", is_strict_aggregation(&registry, &lad, &lsoa)?);
    match is_strict_aggregation(&registry, &lsoa, &lad) {
        Ok(answer) => println!("lsoa agrège lad : {}", answer),
        Err(ReconcileError::TranslationNotFound { .. }) => {
            println!("lsoa agrège lad : non (aucune traduction lad -> lsoa)")
        }
        Err(e) => return Err(e.into()),
    }
    let common = find_common_zoning(&registry, &[Arc::clone(&lsoa), Arc::clone(&msoa), Arc::clone(&lad)])?;
    println!("zonage commun de [lsoa, msoa, lad] : {}", common.name);

    let h = config.segmentation(&["h"])?;
    let fine = SegmentedArray::from_fn(h.clone(), Arc::clone(&lsoa), |key, _| key[0] as f64);
    let coarse = SegmentedArray::filled(h.clone(), Arc::clone(&msoa), 2.0);
    let translated = translate_to_common_zoning(&registry, &[fine, coarse])?;
    for array in &translated {
        println!("{}\n", array);
    }

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 3 : Réduction et expansion {h, age}
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 3 : Réduction {{h, age}} → {{h}} → {{h, age}} ═══\n");

    let h_age = config.segmentation(&["h", "age"])?;
    let ones = SegmentedArray::filled(h_age.clone(), Arc::clone(&msoa), 1.0);
    let collapsed = collapse_to_match(&ones, &h, true)?;
    println!("{}\n", collapsed);
    let restored = expand_to_match(&collapsed, &h_age, SplitMethod::Split)?;
    println!("restauration exacte : {}", if restored == ones { "✓" } else { "✗" });

    let age_emp = config.segmentation(&["age", "pop_emp"])?;
    let by_age = SegmentedArray::filled(config.segmentation(&["age"])?, Arc::clone(&msoa), 90.0);
    let split = expand_to_match(&by_age, &age_emp, SplitMethod::Split)?;
    println!(
        "split avec exclusions : {} clés valides, total conservé {:.1} → {:.1}\n",
        split.keys().len(), by_age.total(), split.total()
    );

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 4 : Proportions
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 4 : Ventilation {{h}} selon {{h, ns_sec}} ═══\n");

    let h_ns_sec = config.segmentation(&["h", "ns_sec"])?;
    let survey = SegmentedArray::from_fn(h_ns_sec, Arc::clone(&msoa), |key, _| (key[0] * key[1]) as f64);
    let population = SegmentedArray::filled(h.clone(), Arc::clone(&msoa), 100.0);
    let ventilated = apply_proportions(&survey, &population)?;
    println!(
        "population {:.1} → ventilée {:.1} sur [{}]\n",
        population.total(), ventilated.total(), ventilated.segmentation().names().join(", ")
    );

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 5 : Recalage
    // ═══════════════════════════════════════════════════════════
    println!("═══ ÉTAPE 5 : Recalage sur les totaux de contrôle ═══\n");

    let controls: HashMap<String, f64> = msoa.zones().iter()
        .enumerate()
        .map(|(i, z)| (z.clone(), 1000.0 * (i + 1) as f64))
        .collect();
    let mut rebalanced = ventilated.clone();
    rebalance_zone_totals(&mut rebalanced, DesiredTotals::Zones(&controls))?;
    for (zone, total) in rebalanced.zone_totals() {
        println!("  {} : {:.3} (cible {:.1})", zone, total, controls.get(&zone).copied().unwrap_or_default());
    }

    let matched = match_target_total(&[rebalanced.clone(), ventilated, population]);
    for (i, array) in matched.iter().enumerate() {
        println!("  tableau {} : total {:.3}", i, array.total());
    }

    // ═══════════════════════════════════════════════════════════
    // ÉTAPE 6 : Réécriture d'une combinaison
    // ═══════════════════════════════════════════════════════════
    println!("\n═══ ÉTAPE 6 : Réécriture de {{age: [1], gender: [2]}} ═══\n");

    let age_gender = config.segmentation(&["age", "gender"])?;
    let base = SegmentedArray::filled(age_gender, Arc::clone(&lad), 1.0);
    let combination = BTreeMap::from([
        ("age".to_string(), vec![1]),
        ("gender".to_string(), vec![2]),
    ]);
    for how in [MatchMode::All, MatchMode::Any] {
        let out = replace_segment_combination(&base, &combination, 0.0, how, true)?;
        let zeroed = out.data().iter().filter(|v| **v == 0.0).count();
        println!("  {} : {} cellules mises à zéro", how, zeroed);
    }

    match validate::validate_array(&rebalanced) {
        Ok(()) => println!("\n✓ Tableau recalé valide"),
        Err(errors) => {
            for e in errors {
                println!("  ✗ {}", e);
            }
        }
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("Réconciliation complète !");
    println!("═══════════════════════════════════════════════════");
    Ok(())
}
