// =============================================================================
// MATCHER — Comparaison des segmentations par NOMS de segments
// =============================================================================
//
// Deux segments de même nom sont supposés équivalents : on ne vérifie ni
// les valeurs ni les exclusions (c'est la responsabilité de l'appelant).
// Toute la comparaison est donc une affaire d'ENSEMBLES DE NOMS.
//
// =============================================================================

use super::array::SegmentedArray;
use super::error::Result;
use super::segmentation::Segmentation;

/// Les noms des segments d'un tableau, dans l'ordre
pub fn segments(array: &SegmentedArray) -> Vec<String> {
    array.segmentation().names()
}

/// `small` est-il un sous-ensemble STRICT de `large` ?
///
/// Tous les noms de `small` sont dans `large` et les ensembles diffèrent.
pub fn is_strict_subset(small: &Segmentation, large: &Segmentation) -> bool {
    let small_names = small.name_set();
    let large_names = large.name_set();
    small_names.is_subset(&large_names) && small_names != large_names
}

/// Différence entre deux segmentations, vue depuis `from`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmentationDiff {
    /// Segments de `to` absents de `from` (dans l'ordre de `to`)
    pub missing: Vec<String>,
    /// Segments de `from` absents de `to` (dans l'ordre de `from`)
    pub extra: Vec<String>,
}

impl SegmentationDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Différence ensembliste des noms de segments
pub fn segmentation_difference(from: &Segmentation, to: &Segmentation) -> SegmentationDiff {
    SegmentationDiff {
        missing: to.names().into_iter().filter(|n| !from.contains(n)).collect(),
        extra: from.names().into_iter().filter(|n| !to.contains(n)).collect(),
    }
}

/// Union : les segments de `first`, puis ceux de `second` qu'il n'a pas.
pub fn union_segmentation(first: &Segmentation, second: &Segmentation) -> Result<Segmentation> {
    let mut union = first.clone();
    for segment in second.segments() {
        if !union.contains(&segment.name) {
            union.add_segment(segment.clone())?;
        }
    }
    Ok(union)
}
