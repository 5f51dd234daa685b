// =============================================================================
// REBALANCE — Recalage des totaux : par zone, et entre plusieurs tableaux
// =============================================================================
//
// Deux opérations de mise à l'échelle :
//
//   1. rebalance_zone_totals : chaque COLONNE (zone) est remise à l'échelle
//      pour que sa somme égale un total cible, en conservant EXACTEMENT la
//      part de chaque cellule dans sa zone.
//
//        facteur[zone] = total_cible[zone] / total_actuel[zone]
//
//      C'est la SEULE opération du cœur qui modifie son argument en place.
//
//   2. match_target_total : le total général du PREMIER tableau fait
//      référence ; chaque tableau suivant est multiplié pour l'atteindre.
//      L'ordre de la liste compte.
//
// =============================================================================

use std::collections::HashMap;

use tracing::{debug, warn};

use super::array::SegmentedArray;
use super::error::{ReconcileError, Result};

/// Totaux cibles par zone.
#[derive(Debug, Clone, Copy)]
pub enum DesiredTotals<'a> {
    /// Les sommes par zone d'un autre tableau
    Array(&'a SegmentedArray),
    /// Une valeur par nom de zone
    Zones(&'a HashMap<String, f64>),
    /// La même valeur pour toutes les zones
    Uniform(f64),
}

impl DesiredTotals<'_> {
    fn resolve(&self, array: &SegmentedArray) -> Result<Vec<f64>> {
        let zones = array.zoning().zones();
        match self {
            DesiredTotals::Uniform(value) => Ok(vec![*value; zones.len()]),
            DesiredTotals::Zones(map) => zones.iter()
                .map(|z| map.get(z).copied().ok_or_else(|| ReconcileError::MissingZoneTotal(z.clone())))
                .collect(),
            DesiredTotals::Array(other) => {
                let totals = other.zone_totals();
                zones.iter()
                    .map(|z| totals.get(z).copied().ok_or_else(|| ReconcileError::MissingZoneTotal(z.clone())))
                    .collect()
            }
        }
    }
}

/// Met `array` à l'échelle, EN PLACE, pour que chaque zone somme à son total cible.
///
/// Tous les facteurs sont calculés avant de toucher la moindre cellule : en
/// cas d'erreur, le tableau est intact. Une zone dont le total actuel est nul
/// n'a pas de répartition à conserver ; elle est laissée telle quelle.
pub fn rebalance_zone_totals(array: &mut SegmentedArray, desired: DesiredTotals<'_>) -> Result<()> {
    let targets = desired.resolve(array)?;
    let bad = targets.iter().filter(|v| !v.is_finite()).count();
    if bad > 0 {
        return Err(ReconcileError::NonFiniteData {
            context: "totaux cibles".into(),
            count: bad,
        });
    }

    let current = array.column_sums();
    let mut factors = Vec::with_capacity(current.len());
    for ((zone, now), want) in array.zoning().zones().iter().zip(&current).zip(&targets) {
        if *now == 0.0 {
            if *want != 0.0 {
                warn!(zone = %zone, desired = want, "zone vide : impossible d'atteindre le total cible");
            }
            factors.push(1.0);
        } else {
            factors.push(want / now);
        }
    }

    for (j, factor) in factors.iter().enumerate() {
        array.data_mut().column_mut(j).mapv_inplace(|v| v * factor);
    }
    debug!(zones = factors.len(), "totaux par zone recalés");
    Ok(())
}

/// Aligne le total général de chaque tableau sur celui du premier.
///
/// Renvoie de nouveaux tableaux ; les arguments ne sont pas modifiés.
pub fn match_target_total(arrays: &[SegmentedArray]) -> Vec<SegmentedArray> {
    let Some((reference, rest)) = arrays.split_first() else {
        warn!("match_target_total appelé sur une liste vide");
        return Vec::new();
    };
    if rest.is_empty() {
        warn!("match_target_total appelé sur un seul tableau : rien à aligner");
        return vec![reference.clone()];
    }

    let reference_total = reference.total();
    let mut out = Vec::with_capacity(arrays.len());
    out.push(reference.clone());
    for (i, array) in rest.iter().enumerate() {
        let total = array.total();
        if total == 0.0 {
            warn!(index = i + 1, "total nul : tableau laissé tel quel");
            out.push(array.clone());
            continue;
        }
        let factor = reference_total / total;
        debug!(index = i + 1, factor, "mise à l'échelle sur le total de référence");
        out.push(array.scale(factor));
    }
    out
}
