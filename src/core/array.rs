// =============================================================================
// ARRAY — Le tableau segmenté : (clé de segmentation) × (zone) → valeur
// =============================================================================
//
// Un SegmentedArray est un tableau à N dimensions « aplati » en deux :
//
//                 zone_1   zone_2   ...   zone_Z
//   (h=1, age=1)   0.5      1.2            ...
//   (h=1, age=2)   ...
//   ...
//
//   - une LIGNE par clé valide de la segmentation (ordre de `keys()`)
//   - une COLONNE par zone du zonage
//
// INVARIANTS :
//   - toute ligne est une clé valide de la segmentation (exclusions comprises)
//   - toutes les colonnes appartiennent à UN SEUL zonage
//   - l'arithmétique élément par élément exige segmentation ET zonage identiques
//
// Chaque opération renvoie un NOUVEAU tableau ; seules `set` et `data_mut`
// modifient en place.
//
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, Axis, Zip};

use super::error::{ReconcileError, Result};
use super::segmentation::{SegmentKey, Segmentation};
use super::zoning::{Translation, ZoningSystem};

/// Tableau dense (clés × zones) de valeurs réelles.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedArray {
    segmentation: Segmentation,
    zoning: Arc<ZoningSystem>,
    keys: Vec<SegmentKey>,
    index: HashMap<SegmentKey, usize>,
    data: Array2<f64>,
}

impl SegmentedArray {
    /// Tableau rempli de zéros
    pub fn zeros(segmentation: Segmentation, zoning: Arc<ZoningSystem>) -> Self {
        SegmentedArray::filled(segmentation, zoning, 0.0)
    }

    /// Tableau rempli d'une constante
    pub fn filled(segmentation: Segmentation, zoning: Arc<ZoningSystem>, value: f64) -> Self {
        let keys = segmentation.keys();
        let index = keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect();
        let data = Array2::from_elem((keys.len(), zoning.len()), value);
        SegmentedArray { segmentation, zoning, keys, index, data }
    }

    /// Tableau dont chaque cellule vaut `f(clé, zone)`.
    pub fn from_fn<F>(segmentation: Segmentation, zoning: Arc<ZoningSystem>, mut f: F) -> Self
    where
        F: FnMut(&[i64], &str) -> f64,
    {
        let mut array = SegmentedArray::zeros(segmentation, zoning);
        for (i, key) in array.keys.iter().enumerate() {
            for (j, zone) in array.zoning.zones().iter().enumerate() {
                array.data[[i, j]] = f(key, zone);
            }
        }
        array
    }

    /// Tableau construit ligne par ligne : `rows[clé]` donne une valeur par zone.
    ///
    /// Les clés absentes valent zéro ; une clé invalide ou une ligne de
    /// mauvaise longueur est une erreur.
    pub fn from_rows(
        segmentation: Segmentation,
        zoning: Arc<ZoningSystem>,
        rows: &[(SegmentKey, Vec<f64>)],
    ) -> Result<Self> {
        let mut array = SegmentedArray::zeros(segmentation, zoning);
        for (key, values) in rows {
            let i = array.row_of(key)?;
            if values.len() != array.zoning.len() {
                return Err(ReconcileError::IncompatibleArrays {
                    operation: "from_rows".into(),
                    reason: format!("{} valeurs pour {} zones", values.len(), array.zoning.len()),
                });
            }
            for (j, v) in values.iter().enumerate() {
                array.data[[i, j]] = *v;
            }
        }
        Ok(array)
    }

    pub fn segmentation(&self) -> &Segmentation {
        &self.segmentation
    }

    pub fn zoning(&self) -> &Arc<ZoningSystem> {
        &self.zoning
    }

    /// Les clés, dans l'ordre des lignes
    pub fn keys(&self) -> &[SegmentKey] {
        &self.keys
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Ligne d'une clé, si elle appartient au tableau
    pub fn row_index(&self, key: &[i64]) -> Option<usize> {
        self.index.get(key).copied()
    }

    fn row_of(&self, key: &[i64]) -> Result<usize> {
        self.index.get(key).copied().ok_or_else(|| ReconcileError::InvalidDefinition(format!(
            "clé {:?} hors de l'espace des clés {:?}", key, self.segmentation.names()
        )))
    }

    /// Lit une cellule
    pub fn get(&self, key: &[i64], zone: &str) -> Result<f64> {
        let i = self.row_of(key)?;
        let j = self.zoning.require_zone(zone)?;
        Ok(self.data[[i, j]])
    }

    /// Écrit une cellule
    pub fn set(&mut self, key: &[i64], zone: &str, value: f64) -> Result<()> {
        let i = self.row_of(key)?;
        let j = self.zoning.require_zone(zone)?;
        self.data[[i, j]] = value;
        Ok(())
    }

    /// Total général
    pub fn total(&self) -> f64 {
        self.data.sum()
    }

    /// Somme de chaque colonne, par nom de zone
    pub fn zone_totals(&self) -> BTreeMap<String, f64> {
        let sums = self.data.sum_axis(Axis(0));
        self.zoning.zones().iter().cloned().zip(sums.iter().copied()).collect()
    }

    /// Somme de chaque colonne, dans l'ordre des zones
    pub fn column_sums(&self) -> Vec<f64> {
        self.data.sum_axis(Axis(0)).to_vec()
    }

    /// Multiplie toutes les cellules par `factor`
    pub fn scale(&self, factor: f64) -> Self {
        SegmentedArray { data: &self.data * factor, ..self.clone() }
    }

    fn check_aligned(&self, other: &SegmentedArray, operation: &str) -> Result<()> {
        if self.zoning != other.zoning {
            return Err(ReconcileError::IncompatibleArrays {
                operation: operation.into(),
                reason: format!("zonages '{}' et '{}'", self.zoning.name, other.zoning.name),
            });
        }
        if self.segmentation != other.segmentation {
            return Err(ReconcileError::IncompatibleArrays {
                operation: operation.into(),
                reason: format!(
                    "segmentations {:?} et {:?}",
                    self.segmentation.names(),
                    other.segmentation.names()
                ),
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &SegmentedArray) -> Result<Self> {
        self.check_aligned(other, "add")?;
        Ok(SegmentedArray { data: &self.data + &other.data, ..self.clone() })
    }

    pub fn sub(&self, other: &SegmentedArray) -> Result<Self> {
        self.check_aligned(other, "sub")?;
        Ok(SegmentedArray { data: &self.data - &other.data, ..self.clone() })
    }

    pub fn mul(&self, other: &SegmentedArray) -> Result<Self> {
        self.check_aligned(other, "mul")?;
        Ok(SegmentedArray { data: &self.data * &other.data, ..self.clone() })
    }

    /// Division élément par élément ; une cellule de diviseur nul donne 0.
    pub fn div(&self, other: &SegmentedArray) -> Result<Self> {
        self.check_aligned(other, "div")?;
        let mut data = self.data.clone();
        Zip::from(&mut data).and(&other.data).for_each(|a, &b| {
            *a = if b == 0.0 { 0.0 } else { *a / b };
        });
        Ok(SegmentedArray { data, ..self.clone() })
    }

    /// Somme sur tous les segments NON nommés.
    ///
    /// Les segments du résultat suivent l'ordre de `keep`.
    pub fn aggregate(&self, keep: &[String]) -> Result<Self> {
        let target = self.segmentation.select(keep)?;
        let positions = self.segmentation.positions_of(keep)?;
        let mut out = SegmentedArray::zeros(target, Arc::clone(&self.zoning));
        for (i, key) in self.keys.iter().enumerate() {
            let projected = Segmentation::project(key, &positions);
            let r = out.row_of(&projected)?;
            let mut row = out.data.row_mut(r);
            row += &self.data.row(i);
        }
        Ok(out)
    }

    /// Même ensemble de segments, dans l'ordre de `target`.
    pub fn reorder(&self, target: &Segmentation) -> Result<Self> {
        if !self.segmentation.same_segments(target) {
            return Err(ReconcileError::SegmentationMismatch {
                missing: target.names().into_iter()
                    .filter(|n| !self.segmentation.contains(n))
                    .collect(),
            });
        }
        let positions = self.segmentation.positions_of(&target.names())?;
        let mut out = SegmentedArray::zeros(target.clone(), Arc::clone(&self.zoning));
        for (i, key) in self.keys.iter().enumerate() {
            let r = out.row_of(&Segmentation::project(key, &positions))?;
            out.data.row_mut(r).assign(&self.data.row(i));
        }
        Ok(out)
    }

    /// Redistribue les valeurs vers un autre zonage.
    ///
    /// valeur(b) = Σ_a valeur(a) · w(a, b)
    pub fn translate_zoning(&self, target: Arc<ZoningSystem>, translation: &Translation) -> Result<Self> {
        if translation.from != self.zoning.name || translation.to != target.name {
            return Err(ReconcileError::ZoningMismatch {
                left: format!("{} -> {}", self.zoning.name, target.name),
                right: format!("{} -> {}", translation.from, translation.to),
            });
        }
        let mut out = SegmentedArray::zeros(self.segmentation.clone(), target);
        for (a_idx, a) in self.zoning.zones().iter().enumerate() {
            for (b, w) in translation.row_weights(a) {
                let b_idx = out.zoning.require_zone(b)?;
                out.data.column_mut(b_idx).scaled_add(*w, &self.data.column(a_idx));
            }
        }
        Ok(out)
    }

    /// Nombre de cellules non finies (NaN, ±∞)
    pub fn non_finite_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_finite()).count()
    }
}

impl fmt::Display for SegmentedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "array [{}] × {} = {{", self.segmentation.names().join(", "), self.zoning.name)?;
        writeln!(f, "  {:>16} {}", "", self.zoning.zones().join("\t"))?;
        for (i, key) in self.keys.iter().enumerate() {
            let cells: Vec<String> = self.data.row(i).iter().map(|v| format!("{:.4}", v)).collect();
            writeln!(f, "  {:>16} {}", format!("{:?}", key), cells.join("\t"))?;
        }
        write!(f, "}} total = {:.4}", self.total())
    }
}
