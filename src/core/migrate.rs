// =============================================================================
// MIGRATE — Expansion et réduction de segmentation (les migrations Δ et Σ)
// =============================================================================
//
// Changer la segmentation d'un tableau, c'est le faire migrer d'un
// « schéma » de catégories vers un autre. Deux directions :
//
// ┌─────────────────────────────────────────────────────────────────────┐
// │                                                                     │
// │  EXPANSION (≈ Δ, tirer)    — ajouter des segments                   │
// │  {h}  →  {h, age}                                                   │
// │  Chaque cellule est répliquée pour chaque valeur du nouveau         │
// │  segment, soit en DUPLIQUANT la valeur (taux, proportions),         │
// │  soit en la RÉPARTISSANT à parts égales (effectifs additifs).       │
// │                                                                     │
// │  RÉDUCTION (≈ Σ, pousser)  — retirer des segments                   │
// │  {h, age}  →  {h}                                                   │
// │  On somme sur tous les segments qui disparaissent.                  │
// │                                                                     │
// └─────────────────────────────────────────────────────────────────────┘
//
// Les nouveaux segments sont ajoutés UN PAR UN, dans l'ordre de la cible ;
// à chaque ajout, les exclusions sont réappliquées : une réplique
// structurellement invalide n'existe pas (elle n'est pas mise à zéro,
// elle disparaît).
//
// Une expansion ou une réduction SANS EFFET (mêmes segments) réussit en
// renvoyant une copie, mais avertit : l'appelant attendait un changement.
//
// =============================================================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use super::array::SegmentedArray;
use super::error::{ReconcileError, Result};
use super::matcher::{is_strict_subset, segmentation_difference};
use super::segment::Segment;
use super::segmentation::{SegmentKey, Segmentation};

/// Politique de réplication lors de l'ajout d'un segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMethod {
    /// La valeur est copiée telle quelle dans chaque réplique
    Duplicate,
    /// La valeur est divisée à parts égales entre les répliques valides
    Split,
}

impl FromStr for SplitMethod {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "duplicate" => Ok(SplitMethod::Duplicate),
            "split" => Ok(SplitMethod::Split),
            other => Err(ReconcileError::InvalidDefinition(format!(
                "méthode de répartition inconnue : '{}'", other
            ))),
        }
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMethod::Duplicate => write!(f, "duplicate"),
            SplitMethod::Split => write!(f, "split"),
        }
    }
}

/// Étend `array` jusqu'à la segmentation `target`.
///
/// Exige que les segments du tableau soient un sous-ensemble STRICT de ceux
/// de la cible ; des segmentations identiques donnent une copie (avec
/// avertissement). Le résultat porte exactement la segmentation `target`.
pub fn expand_to_match(
    array: &SegmentedArray,
    target: &Segmentation,
    method: SplitMethod,
) -> Result<SegmentedArray> {
    if array.segmentation().same_segments(target) {
        warn!(
            segments = ?target.names(),
            "expand_to_match sans effet : les segmentations sont déjà identiques"
        );
        return Ok(array.clone());
    }
    if !is_strict_subset(array.segmentation(), target) {
        let diff = segmentation_difference(array.segmentation(), target);
        return Err(ReconcileError::SegmentationMismatch { missing: diff.extra });
    }
    expand_segments(array, target, method)
}

/// Expansion sans contrôle préalable ni avertissement (usage interne).
///
/// Les segments déjà présents prennent d'abord la définition de `target`
/// (exclusions comprises) ; puis chaque segment absent du tableau est
/// ajouté dans l'ordre de `target`, et le tout est réordonné selon `target`.
pub(crate) fn expand_segments(
    array: &SegmentedArray,
    target: &Segmentation,
    method: SplitMethod,
) -> Result<SegmentedArray> {
    let base = target.select(&array.segmentation().names())?;
    let mut current = if base == *array.segmentation() {
        array.clone()
    } else {
        adopt_definitions(array, base)
    };
    for segment in target.segments() {
        if !current.segmentation().contains(&segment.name) {
            current = add_segment(&current, segment, method)?;
        }
    }
    debug!(
        from = ?array.segmentation().names(),
        to = ?target.names(),
        %method,
        "expansion de segmentation"
    );
    current.reorder(target)
}

/// Recopie `array` sous une segmentation de mêmes noms, dans le même ordre,
/// mais dont les définitions peuvent différer. Les lignes devenues invalides
/// disparaissent.
fn adopt_definitions(array: &SegmentedArray, segmentation: Segmentation) -> SegmentedArray {
    let mut out = SegmentedArray::zeros(segmentation, Arc::clone(array.zoning()));
    let mut lost = 0.0;
    for (p, key) in array.keys().iter().enumerate() {
        match out.row_index(key) {
            Some(r) => out.data_mut().row_mut(r).assign(&array.data().row(p)),
            None => lost += array.data().row(p).sum(),
        }
    }
    if lost != 0.0 {
        warn!(
            segments = ?array.segmentation().names(),
            lost,
            "les exclusions de la cible suppriment des lignes existantes"
        );
    }
    out
}

/// Ajoute UN segment en dernière position.
fn add_segment(array: &SegmentedArray, segment: &Segment, method: SplitMethod) -> Result<SegmentedArray> {
    let extended = array.segmentation().with_segment(segment.clone())?;
    let mut out = SegmentedArray::zeros(extended, Arc::clone(array.zoning()));
    let keys: Vec<SegmentKey> = out.keys().to_vec();
    let parent_len = array.segmentation().len();

    // Nombre de répliques VALIDES par clé parente (exclusions déjà appliquées)
    let mut replicas: HashMap<&[i64], usize> = HashMap::new();
    for key in &keys {
        *replicas.entry(&key[..parent_len]).or_insert(0) += 1;
    }

    for (r, key) in keys.iter().enumerate() {
        let parent = &key[..parent_len];
        let p = array.row_index(parent).ok_or_else(|| ReconcileError::InvalidDefinition(format!(
            "clé parente {:?} absente du tableau source", parent
        )))?;
        let factor = match method {
            SplitMethod::Duplicate => 1.0,
            SplitMethod::Split => 1.0 / replicas[parent] as f64,
        };
        let row = &array.data().row(p) * factor;
        out.data_mut().row_mut(r).assign(&row);
    }

    // Valeurs dont toutes les répliques sont exclues : elles disparaissent
    let mut lost = 0.0;
    for (p, key) in array.keys().iter().enumerate() {
        if !replicas.contains_key(key.as_slice()) {
            lost += array.data().row(p).sum();
        }
    }
    if lost != 0.0 {
        warn!(
            segment = %segment.name,
            lost,
            "des exclusions ne laissent aucune réplique valide à certaines clés"
        );
    }
    Ok(out)
}

/// Réduit `array` à la segmentation `target` en sommant les segments en trop.
///
/// - `strict = true` : les segments de la cible doivent tous exister dans le
///   tableau, sinon erreur.
/// - `strict = false` : on garde l'intersection ; une intersection vide est
///   une erreur.
///
/// Des segmentations identiques donnent une copie (avec avertissement).
pub fn collapse_to_match(
    array: &SegmentedArray,
    target: &Segmentation,
    strict: bool,
) -> Result<SegmentedArray> {
    if array.segmentation().same_segments(target) {
        warn!(
            segments = ?target.names(),
            "collapse_to_match sans effet : les segmentations sont déjà identiques"
        );
        return Ok(array.clone());
    }

    let keep: Vec<String> = if strict {
        let diff = segmentation_difference(array.segmentation(), target);
        if !diff.missing.is_empty() {
            return Err(ReconcileError::SegmentationMismatch { missing: diff.missing });
        }
        target.names()
    } else {
        let keep: Vec<String> = target.names().into_iter()
            .filter(|n| array.segmentation().contains(n))
            .collect();
        if keep.is_empty() {
            return Err(ReconcileError::NoSegmentOverlap {
                source_segments: array.segmentation().names(),
                target_segments: target.names(),
            });
        }
        keep
    };

    if keep.len() == array.segmentation().len() {
        warn!(segments = ?keep, "collapse_to_match : aucun segment à sommer");
    }
    debug!(from = ?array.segmentation().names(), to = ?keep, strict, "réduction de segmentation");
    array.aggregate(&keep)
}
