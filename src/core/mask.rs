// =============================================================================
// MASK — Réécriture des cellules d'une combinaison de segments
// =============================================================================
//
// Une COMBINAISON associe à des noms de segments des ensembles de valeurs :
//
//   { age: [1], gender: [2] }
//
// Chaque segment nommé donne un prédicat sur les lignes (« la valeur de
// la ligne sur cet axe est dans l'ensemble »). Les prédicats se combinent :
//   - MatchMode::All  → ET  (toutes les conditions)
//   - MatchMode::Any  → OU  (au moins une)
//
// Les cellules retenues reçoivent la nouvelle valeur, dans TOUTES les zones.
// Une cellule retenue qui vaut déjà zéro ne la reçoit que si
// `include_zeroes` est vrai. Les autres cellules ne sont jamais touchées.
//
// La sélection se fait par masque booléen explicite : les valeurs non
// finies déjà présentes ne gênent pas.
//
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::array::SegmentedArray;
use super::error::{ReconcileError, Result};

/// Segment → valeurs à retenir
pub type SegmentCombination = BTreeMap<String, Vec<i64>>;

/// Combinaison des prédicats par segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// ET logique
    All,
    /// OU logique
    Any,
}

impl FromStr for MatchMode {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(MatchMode::All),
            "any" => Ok(MatchMode::Any),
            other => Err(ReconcileError::InvalidDefinition(format!(
                "mode de combinaison inconnu : '{}' (attendu 'all' ou 'any')", other
            ))),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::All => write!(f, "all"),
            MatchMode::Any => write!(f, "any"),
        }
    }
}

/// Lignes du tableau retenues par la combinaison.
pub fn combination_mask(
    array: &SegmentedArray,
    combination: &SegmentCombination,
    how: MatchMode,
) -> Result<Vec<bool>> {
    if combination.is_empty() {
        return Err(ReconcileError::InvalidDefinition("combinaison de segments vide".into()));
    }

    let segmentation = array.segmentation();
    let mut predicates: Vec<(usize, &[i64])> = Vec::with_capacity(combination.len());
    for (name, values) in combination {
        let position = segmentation.position(name)
            .ok_or_else(|| ReconcileError::UnknownSegment(name.clone()))?;
        let segment = &segmentation.segments()[position];
        for value in values {
            segment.check(*value)?;
        }
        predicates.push((position, values.as_slice()));
    }

    let mask = array.keys().iter()
        .map(|key| {
            let mut hits = predicates.iter().map(|(pos, values)| values.contains(&key[*pos]));
            match how {
                MatchMode::All => hits.all(|h| h),
                MatchMode::Any => hits.any(|h| h),
            }
        })
        .collect();
    Ok(mask)
}

/// Copie de `array` où les cellules de la combinaison valent `value`.
pub fn replace_segment_combination(
    array: &SegmentedArray,
    combination: &SegmentCombination,
    value: f64,
    how: MatchMode,
    include_zeroes: bool,
) -> Result<SegmentedArray> {
    let mask = combination_mask(array, combination, how)?;

    let mut out = array.clone();
    let mut rewritten = 0usize;
    for (i, selected) in mask.iter().enumerate() {
        if !selected {
            continue;
        }
        for cell in out.data_mut().row_mut(i).iter_mut() {
            if *cell != 0.0 || include_zeroes {
                *cell = value;
                rewritten += 1;
            }
        }
    }
    debug!(
        segments = ?combination.keys().collect::<Vec<_>>(),
        %how,
        rows = mask.iter().filter(|m| **m).count(),
        cells = rewritten,
        "combinaison réécrite"
    );
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::segment::Segment;
    use crate::core::segmentation::Segmentation;
    use crate::core::zoning::ZoningSystem;

    /// age × gender (2 × 2), deux zones ; valeur = 10·age + gender (+100 en z2)
    fn array() -> SegmentedArray {
        let seg = Segmentation::new(vec![
            Segment::with_codes("age", 1..=2),
            Segment::with_codes("gender", 1..=2),
        ]).unwrap();
        let zoning = Arc::new(ZoningSystem::new("test", ["z1", "z2"]).unwrap());
        SegmentedArray::from_fn(seg, zoning, |key, zone| {
            let base = (10 * key[0] + key[1]) as f64;
            if zone == "z2" { base + 100.0 } else { base }
        })
    }

    fn combination() -> SegmentCombination {
        BTreeMap::from([
            ("age".to_string(), vec![1]),
            ("gender".to_string(), vec![2]),
        ])
    }

    #[test]
    fn test_all_is_intersection() {
        let out = replace_segment_combination(&array(), &combination(), -1.0, MatchMode::All, true).unwrap();
        assert_eq!(out.get(&[1, 2], "z1").unwrap(), -1.0);
        assert_eq!(out.get(&[1, 2], "z2").unwrap(), -1.0);
        assert_eq!(out.get(&[1, 1], "z1").unwrap(), 11.0);
        assert_eq!(out.get(&[2, 2], "z1").unwrap(), 22.0);
        assert_eq!(out.get(&[2, 1], "z2").unwrap(), 121.0);
    }

    #[test]
    fn test_any_is_union() {
        let out = replace_segment_combination(&array(), &combination(), -1.0, MatchMode::Any, true).unwrap();
        assert_eq!(out.get(&[1, 1], "z1").unwrap(), -1.0);
        assert_eq!(out.get(&[1, 2], "z2").unwrap(), -1.0);
        assert_eq!(out.get(&[2, 2], "z1").unwrap(), -1.0);
        assert_eq!(out.get(&[2, 1], "z1").unwrap(), 21.0);
        assert_eq!(out.get(&[2, 1], "z2").unwrap(), 121.0);
    }

    #[test]
    fn test_include_zeroes() {
        let mut a = array();
        a.set(&[1, 2], "z1", 0.0).unwrap();
        a.set(&[2, 1], "z1", 0.0).unwrap();

        let kept = replace_segment_combination(&a, &combination(), 7.0, MatchMode::All, false).unwrap();
        assert_eq!(kept.get(&[1, 2], "z1").unwrap(), 0.0);
        assert_eq!(kept.get(&[1, 2], "z2").unwrap(), 7.0);

        let filled = replace_segment_combination(&a, &combination(), 7.0, MatchMode::All, true).unwrap();
        assert_eq!(filled.get(&[1, 2], "z1").unwrap(), 7.0);
        // zéro hors combinaison : jamais touché
        assert_eq!(filled.get(&[2, 1], "z1").unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_cells_do_not_block() {
        let mut a = array();
        a.set(&[2, 2], "z1", f64::INFINITY).unwrap();
        let out = replace_segment_combination(&a, &combination(), 0.5, MatchMode::All, true).unwrap();
        assert_eq!(out.get(&[1, 2], "z1").unwrap(), 0.5);
        assert!(out.get(&[2, 2], "z1").unwrap().is_infinite());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let a = array();
        let before = a.clone();
        let _ = replace_segment_combination(&a, &combination(), 0.0, MatchMode::Any, true).unwrap();
        assert_eq!(a, before);
    }

    #[test]
    fn test_invalid_combinations() {
        let a = array();
        let unknown_segment = BTreeMap::from([("ns_sec".to_string(), vec![1])]);
        assert!(matches!(
            replace_segment_combination(&a, &unknown_segment, 0.0, MatchMode::All, true),
            Err(ReconcileError::UnknownSegment(_))
        ));
        let unknown_value = BTreeMap::from([("age".to_string(), vec![9])]);
        assert!(matches!(
            replace_segment_combination(&a, &unknown_value, 0.0, MatchMode::All, true),
            Err(ReconcileError::UnknownSegmentValue { .. })
        ));
        assert!(replace_segment_combination(&a, &BTreeMap::new(), 0.0, MatchMode::All, true).is_err());
        assert_eq!("ANY".parse::<MatchMode>().unwrap(), MatchMode::Any);
    }
}
