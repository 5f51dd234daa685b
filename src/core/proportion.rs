// =============================================================================
// PROPORTION — Application de proportions d'un tableau à un autre
// =============================================================================
//
// On veut ventiler un tableau CIBLE (ex : population par {h}) selon la
// répartition observée dans un tableau SOURCE (ex : population par
// {h, ns_sec}).
//
// ALGORITHME :
//   1. Étendre la source jusqu'à l'union des segmentations, en DUPLIQUANT
//      (les proportions sont des taux : la réplication ne doit pas les diluer)
//   2. Sommer la source étendue jusqu'à la segmentation de la cible
//      → dénominateur par (clé cible, zone)
//   3. proportion = source étendue / dénominateur
//      Un dénominateur nul donne une proportion NULLE :
//      « pas d'information ⇒ pas d'allocation », jamais une part égale
//   4. résultat = cible (dupliquée sur l'union) × proportions
//
// Les deux tableaux doivent déjà partager le même zonage : aucune
// traduction n'est tentée ici.
//
// =============================================================================

use tracing::{debug, warn};

use super::array::SegmentedArray;
use super::error::{ReconcileError, Result};
use super::matcher::union_segmentation;
use super::migrate::{expand_segments, SplitMethod};
use super::segmentation::Segmentation;

/// Proportions de `source` au sein de chaque clé de `target`.
///
/// Le résultat porte l'union (segments de `target`, puis ceux propres à la
/// source). Pour chaque clé cible et chaque zone, la somme des proportions
/// sur les segments propres à la source vaut 1, ou 0 si la source n'y a
/// aucune donnée.
pub fn derive_proportions(source: &SegmentedArray, target: &Segmentation) -> Result<SegmentedArray> {
    let union = union_segmentation(target, source.segmentation())?;
    let expanded = expand_segments(source, &union, SplitMethod::Duplicate)?;

    let totals = expanded.aggregate(&target.names())?;
    let denominator = expand_segments(&totals, &union, SplitMethod::Duplicate)?;

    let empty = denominator.data().iter().filter(|v| **v == 0.0).count();
    if empty > 0 {
        warn!(
            cells = empty,
            segments = ?target.names(),
            "dénominateur nul : proportion fixée à 0 pour ces cellules"
        );
    }
    expanded.div(&denominator)
}

/// Ventile `target` selon la répartition de `source`.
///
/// Le résultat porte l'union des segments des deux tableaux.
pub fn apply_proportions(source: &SegmentedArray, target: &SegmentedArray) -> Result<SegmentedArray> {
    if source.zoning() != target.zoning() {
        return Err(ReconcileError::ZoningMismatch {
            left: source.zoning().name.clone(),
            right: target.zoning().name.clone(),
        });
    }
    let union = union_segmentation(target.segmentation(), source.segmentation())?;
    let proportions = derive_proportions(source, target.segmentation())?;
    let expanded_target = expand_segments(target, &union, SplitMethod::Duplicate)?;

    debug!(
        source = ?source.segmentation().names(),
        target = ?target.segmentation().names(),
        result = ?union.names(),
        "application de proportions"
    );
    expanded_target.mul(&proportions)
}
