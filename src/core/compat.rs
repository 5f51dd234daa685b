// =============================================================================
// COMPAT — Compatibilité entre zonages (agrégation stricte)
// =============================================================================
//
// Un zonage GROSSIER G agrège STRICTEMENT un zonage FIN F quand chaque zone
// de F tombe entièrement (poids 1) dans exactement une zone de G :
//
//     F :  l1  l2 | l3  l4          G :   m1    |    m2
//          └──┬──┘   └──┬──┘
//             m1        m2          → chaque l* a un unique parent, poids 1
//
// La relation est ORIENTÉE : agrège(G, F) n'implique pas agrège(F, G).
//
// RECHERCHE D'UN ZONAGE COMMUN :
//   On replie la liste en gardant le candidat « le plus grossier » :
//     - zonage égal au candidat         → on passe
//     - le candidat l'agrège            → on passe
//     - il agrège le candidat           → il devient le candidat
//     - sinon                           → erreur : zonages incompatibles
//
//   Seules les CHAÎNES sont gérées (ordre total), pas les treillis.
//
// =============================================================================

use std::sync::Arc;

use tracing::debug;

use super::array::SegmentedArray;
use super::error::{ReconcileError, Result};
use super::registry::ZoneSystemRegistry;
use super::zoning::{WeightingMode, ZoningSystem};

/// `larger` agrège-t-il strictement `smaller` ?
///
/// Utilise la traduction spatiale `smaller → larger` du registre (directe ou
/// composée). Une traduction introuvable est une erreur.
pub fn is_strict_aggregation(
    registry: &ZoneSystemRegistry,
    larger: &ZoningSystem,
    smaller: &ZoningSystem,
) -> Result<bool> {
    let translation = registry.translation(&smaller.name, &larger.name, WeightingMode::Spatial)?;
    let tolerance = registry.tolerance();

    for zone in smaller.zones() {
        let covering: Vec<&(String, f64)> = translation.row_weights(zone)
            .iter()
            .filter(|(_, w)| w.abs() > tolerance)
            .collect();
        match covering.as_slice() {
            [(_, w)] if (w - 1.0).abs() <= tolerance => {}
            _ => {
                debug!(
                    larger = %larger.name,
                    smaller = %smaller.name,
                    zone = %zone,
                    parents = covering.len(),
                    "zone non agrégée strictement"
                );
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Comme `is_strict_aggregation`, mais une traduction absente vaut « non ».
fn aggregates(registry: &ZoneSystemRegistry, larger: &ZoningSystem, smaller: &ZoningSystem) -> Result<bool> {
    match is_strict_aggregation(registry, larger, smaller) {
        Err(ReconcileError::TranslationNotFound { .. }) => Ok(false),
        other => other,
    }
}

/// Le zonage le plus grossier de la liste, qui agrège strictement tous les autres.
pub fn find_common_zoning(
    registry: &ZoneSystemRegistry,
    systems: &[Arc<ZoningSystem>],
) -> Result<Arc<ZoningSystem>> {
    let (first, rest) = systems.split_first().ok_or_else(|| {
        ReconcileError::InvalidDefinition("aucun zonage fourni".into())
    })?;

    let mut candidate = Arc::clone(first);
    for system in rest {
        if **system == *candidate || aggregates(registry, &candidate, system)? {
            continue;
        }
        if aggregates(registry, system, &candidate)? {
            candidate = Arc::clone(system);
            continue;
        }
        return Err(ReconcileError::IncompatibleZoning {
            candidate: candidate.name.clone(),
            other: system.name.clone(),
        });
    }
    debug!(common = %candidate.name, inputs = systems.len(), "zonage commun trouvé");
    Ok(candidate)
}

/// Traduit chaque tableau vers le zonage commun de la liste.
pub fn translate_to_common_zoning(
    registry: &ZoneSystemRegistry,
    arrays: &[SegmentedArray],
) -> Result<Vec<SegmentedArray>> {
    let systems: Vec<Arc<ZoningSystem>> = arrays.iter().map(|a| Arc::clone(a.zoning())).collect();
    let common = find_common_zoning(registry, &systems)?;

    arrays.iter()
        .map(|array| {
            if **array.zoning() == *common {
                return Ok(array.clone());
            }
            let translation = registry.translation(&array.zoning().name, &common.name, WeightingMode::Spatial)?;
            array.translate_zoning(Arc::clone(&common), &translation)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::Segment;
    use crate::core::segmentation::Segmentation;
    use crate::core::zoning::Translation;

    struct Chain {
        registry: ZoneSystemRegistry,
        lad: Arc<ZoningSystem>,
        msoa: Arc<ZoningSystem>,
        lsoa: Arc<ZoningSystem>,
    }

    /// LSOA ⊂ MSOA ⊂ LAD, seules les traductions voisines sont enregistrées
    fn chain() -> Chain {
        let mut registry = ZoneSystemRegistry::new();
        let lad = registry.register(ZoningSystem::new("lad", ["A", "B"]).unwrap()).unwrap();
        let msoa = registry.register(ZoningSystem::new("msoa", ["m1", "m2", "m3"]).unwrap()).unwrap();
        let lsoa = registry.register(ZoningSystem::new("lsoa", ["l1", "l2", "l3", "l4", "l5"]).unwrap()).unwrap();
        registry.register_translation(Translation::from_lookup(&lsoa, &msoa, &[
            ("l1", "m1"), ("l2", "m1"), ("l3", "m2"), ("l4", "m3"), ("l5", "m3"),
        ]).unwrap()).unwrap();
        registry.register_translation(Translation::from_lookup(&msoa, &lad, &[
            ("m1", "A"), ("m2", "A"), ("m3", "B"),
        ]).unwrap()).unwrap();
        registry.register_translation(Translation::from_weights(&lad, &msoa, WeightingMode::Spatial, &[
            ("A", "m1", 0.6), ("A", "m2", 0.4), ("B", "m3", 1.0),
        ]).unwrap()).unwrap();
        Chain { registry, lad, msoa, lsoa }
    }

    #[test]
    fn test_strict_aggregation_is_directional() {
        let c = chain();
        assert!(is_strict_aggregation(&c.registry, &c.lad, &c.msoa).unwrap());
        assert!(!is_strict_aggregation(&c.registry, &c.msoa, &c.lad).unwrap());
    }

    #[test]
    fn test_strict_aggregation_through_chain() {
        let c = chain();
        assert!(is_strict_aggregation(&c.registry, &c.lad, &c.lsoa).unwrap());
    }

    #[test]
    fn test_missing_translation_is_error() {
        let c = chain();
        assert!(matches!(
            is_strict_aggregation(&c.registry, &c.lsoa, &c.msoa),
            Err(ReconcileError::TranslationNotFound { .. })
        ));
    }

    #[test]
    fn test_find_common_zoning_any_order() {
        let c = chain();
        for order in [
            vec![c.lad.clone(), c.msoa.clone(), c.lsoa.clone()],
            vec![c.lsoa.clone(), c.msoa.clone(), c.lad.clone()],
            vec![c.msoa.clone(), c.lsoa.clone(), c.lad.clone(), c.msoa.clone()],
        ] {
            let common = find_common_zoning(&c.registry, &order).unwrap();
            assert_eq!(common.name, "lad");
        }
    }

    #[test]
    fn test_find_common_zoning_single_and_empty() {
        let c = chain();
        assert_eq!(find_common_zoning(&c.registry, &[c.msoa.clone()]).unwrap().name, "msoa");
        assert!(find_common_zoning(&c.registry, &[]).is_err());
    }

    #[test]
    fn test_incomparable_zonings_fail() {
        let mut c = chain();
        let ward = c.registry.register(ZoningSystem::new("ward", ["w1", "w2"]).unwrap()).unwrap();
        let err = find_common_zoning(&c.registry, &[c.msoa.clone(), ward]);
        assert!(matches!(err, Err(ReconcileError::IncompatibleZoning { .. })));
    }

    #[test]
    fn test_translate_to_common_zoning() {
        let c = chain();
        let seg = Segmentation::new(vec![Segment::with_codes("h", 1..=2)]).unwrap();
        let fine = SegmentedArray::filled(seg.clone(), c.lsoa.clone(), 1.0);
        let coarse = SegmentedArray::filled(seg, c.lad.clone(), 2.0);

        let aligned = translate_to_common_zoning(&c.registry, &[fine, coarse]).unwrap();
        assert_eq!(aligned[0].zoning().name, "lad");
        assert_eq!(aligned[0].get(&[1], "A").unwrap(), 3.0);
        assert_eq!(aligned[0].get(&[2], "B").unwrap(), 2.0);
        assert_eq!(aligned[1].total(), 8.0);
    }
}
