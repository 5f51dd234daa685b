// =============================================================================
// SEGMENTATION — La liste ordonnée des axes d'un tableau segmenté
// =============================================================================
//
// Une Segmentation est une suite ORDONNÉE de Segments, sans doublon de nom.
// Elle définit l'ESPACE DES CLÉS d'un tableau :
//
//   clés valides = produit cartésien des valeurs de chaque segment
//                  MOINS les combinaisons interdites par les exclusions
//
// EXEMPLE :
//   h   = { 1, 2 }
//   age = { 1, 2, 3 }       avec  age=1 exclut h=2
//
//   clés = (1,1) (1,2) (1,3) (2,2) (2,3)      ← (2,1) est exclue
//
// Une clé est un vecteur de codes, dans l'ordre des segments.
// La segmentation VIDE a exactement une clé : le tuple vide.
//
// =============================================================================

use std::collections::BTreeSet;
use std::fmt;

use super::error::{ReconcileError, Result};
use super::segment::Segment;

/// Une clé = un code par segment, dans l'ordre de la segmentation
pub type SegmentKey = Vec<i64>;

/// Suite ordonnée de segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segmentation {
    segments: Vec<Segment>,
}

impl Segmentation {
    /// Construit une segmentation ; refuse les noms en double et les segments vides.
    pub fn new(segments: Vec<Segment>) -> Result<Self> {
        let mut segmentation = Segmentation::empty();
        for segment in segments {
            segmentation.add_segment(segment)?;
        }
        Ok(segmentation)
    }

    pub fn empty() -> Self {
        Segmentation { segments: Vec::new() }
    }

    /// Ajoute un segment en dernière position
    pub fn add_segment(&mut self, segment: Segment) -> Result<&mut Self> {
        if self.contains(&segment.name) {
            return Err(ReconcileError::InvalidDefinition(format!(
                "segment '{}' déclaré deux fois", segment.name
            )));
        }
        if segment.is_empty() {
            return Err(ReconcileError::InvalidDefinition(format!(
                "segment '{}' sans aucune valeur", segment.name
            )));
        }
        self.segments.push(segment);
        Ok(self)
    }

    /// Copie de cette segmentation avec `segment` ajouté à la fin
    pub fn with_segment(&self, segment: Segment) -> Result<Segmentation> {
        let mut out = self.clone();
        out.add_segment(segment)?;
        Ok(out)
    }

    /// Sous-segmentation formée des segments nommés, dans l'ordre donné.
    pub fn select(&self, names: &[String]) -> Result<Segmentation> {
        let mut out = Segmentation::empty();
        for name in names {
            let segment = self.get(name)
                .ok_or_else(|| ReconcileError::UnknownSegment(name.clone()))?;
            out.add_segment(segment.clone())?;
        }
        Ok(out)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Noms des segments, dans l'ordre
    pub fn names(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.name.clone()).collect()
    }

    pub fn name_set(&self) -> BTreeSet<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.segments.iter().position(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Même ensemble de noms, quel que soit l'ordre
    pub fn same_segments(&self, other: &Segmentation) -> bool {
        self.name_set() == other.name_set()
    }

    /// Positions, dans CETTE segmentation, des segments nommés.
    pub fn positions_of(&self, names: &[String]) -> Result<Vec<usize>> {
        names.iter()
            .map(|n| self.position(n).ok_or_else(|| ReconcileError::UnknownSegment(n.clone())))
            .collect()
    }

    /// Une clé appartient-elle à l'espace des clés valides ?
    ///
    /// Une exclusion ne s'applique que si les deux segments qu'elle relie
    /// sont présents dans la segmentation.
    pub fn is_valid_key(&self, key: &[i64]) -> bool {
        if key.len() != self.segments.len() {
            return false;
        }
        if self.segments.iter().zip(key).any(|(s, code)| !s.contains(*code)) {
            return false;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            for rule in segment.exclusions() {
                if let Some(j) = self.position(&rule.other_segment) {
                    if rule.forbids(key[i], key[j]) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Toutes les clés valides, en ordre lexicographique des codes.
    pub fn keys(&self) -> Vec<SegmentKey> {
        let mut keys: Vec<SegmentKey> = vec![Vec::new()];
        for segment in &self.segments {
            let mut next = Vec::with_capacity(keys.len() * segment.len());
            for prefix in &keys {
                for code in segment.codes() {
                    let mut key = prefix.clone();
                    key.push(code);
                    next.push(key);
                }
            }
            keys = next;
        }
        keys.retain(|k| self.is_valid_key(k));
        keys
    }

    /// Projette une clé de CETTE segmentation sur les positions données.
    pub fn project(key: &[i64], positions: &[usize]) -> SegmentKey {
        positions.iter().map(|&p| key[p]).collect()
    }
}

impl fmt::Display for Segmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "segmentation {{")?;
        for segment in &self.segments {
            writeln!(f, "  {}", segment)?;
            for rule in segment.exclusions() {
                writeln!(f, "    exclut {} ∈ {:?} quand {} = {}",
                         rule.other_segment, rule.other_values, segment.name, rule.own_value)?;
            }
        }
        write!(f, "}}")
    }
}
