// =============================================================================
// ZONING — Les systèmes de zones et les traductions entre eux
// =============================================================================
//
// Un ZoningSystem est une PARTITION nommée de la zone d'étude :
//   LSOA (fin) ⊂ MSOA ⊂ LAD (grossier)
// Chaque zone est atomique. Un zonage est immuable une fois construit.
//
// Une TRADUCTION A → B est une matrice creuse de poids de recouvrement :
//
//     w(a, b) = part de la zone a qui tombe dans la zone b
//
// Pour une zone a donnée, les poids vers toutes les zones b qui la couvrent
// somment à 1 (ou à la fraction réelle de recouvrement selon le mode de
// pondération).
//
// ANALOGIE : une traduction est aux zonages ce qu'un Mapping est aux
// schémas : elle dit comment « pousser » des valeurs d'une partition vers
// une autre.
//
//   LSOA --w--> MSOA --w--> LAD      (composition = produit matriciel)
//
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::error::{ReconcileError, Result};

/// Une partition nommée de la zone d'étude.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoningSystem {
    pub name: String,
    zones: Vec<String>,
    index: HashMap<String, usize>,
}

impl ZoningSystem {
    /// Crée un zonage ; refuse un zonage vide ou une zone répétée.
    pub fn new<Z: ToString>(name: &str, zones: impl IntoIterator<Item = Z>) -> Result<Self> {
        let zones: Vec<String> = zones.into_iter().map(|z| z.to_string()).collect();
        if zones.is_empty() {
            return Err(ReconcileError::InvalidDefinition(format!(
                "zonage '{}' sans aucune zone", name
            )));
        }
        let mut index = HashMap::with_capacity(zones.len());
        for (i, zone) in zones.iter().enumerate() {
            if index.insert(zone.clone(), i).is_some() {
                return Err(ReconcileError::InvalidDefinition(format!(
                    "zone '{}' répétée dans le zonage '{}'", zone, name
                )));
            }
        }
        Ok(ZoningSystem { name: name.to_string(), zones, index })
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zone_index(&self, zone: &str) -> Option<usize> {
        self.index.get(zone).copied()
    }

    /// Comme `zone_index`, mais en erreur si la zone est inconnue
    pub fn require_zone(&self, zone: &str) -> Result<usize> {
        self.zone_index(zone).ok_or_else(|| ReconcileError::UnknownZone {
            zoning: self.name.clone(),
            zone: zone.to_string(),
        })
    }
}

impl fmt::Display for ZoningSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zoning {} ({} zones)", self.name, self.zones.len())
    }
}

/// Mode de pondération d'une traduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightingMode {
    /// Recouvrement de surface
    Spatial,
    /// Recouvrement pondéré par la population
    Population,
    /// Recouvrement pondéré par l'emploi
    Employment,
    /// Poids uniformes
    NoWeighting,
}

impl fmt::Display for WeightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightingMode::Spatial => write!(f, "spatial"),
            WeightingMode::Population => write!(f, "population"),
            WeightingMode::Employment => write!(f, "employment"),
            WeightingMode::NoWeighting => write!(f, "no_weighting"),
        }
    }
}

/// Matrice creuse de poids entre deux zonages.
///
/// `rows[a]` = liste des (b, w(a, b)) pour la zone source a.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub from: String,
    pub to: String,
    pub mode: WeightingMode,
    rows: BTreeMap<String, Vec<(String, f64)>>,
}

impl Translation {
    /// Traduction « plusieurs vers un » : chaque zone fine a un unique parent, poids 1.
    pub fn from_lookup(
        from: &ZoningSystem,
        to: &ZoningSystem,
        pairs: &[(&str, &str)],
    ) -> Result<Self> {
        let triples: Vec<(&str, &str, f64)> = pairs.iter().map(|(a, b)| (*a, *b, 1.0)).collect();
        Translation::from_weights(from, to, WeightingMode::Spatial, &triples)
    }

    /// Traduction quelconque à partir de triplets (zone_a, zone_b, poids).
    pub fn from_weights(
        from: &ZoningSystem,
        to: &ZoningSystem,
        mode: WeightingMode,
        triples: &[(&str, &str, f64)],
    ) -> Result<Self> {
        let mut rows: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();
        for (a, b, w) in triples {
            from.require_zone(a)?;
            to.require_zone(b)?;
            if !w.is_finite() || *w < 0.0 {
                return Err(ReconcileError::InvalidDefinition(format!(
                    "poids {} invalide pour {} -> {}", w, a, b
                )));
            }
            rows.entry(a.to_string()).or_default().push((b.to_string(), *w));
        }
        Ok(Translation {
            from: from.name.clone(),
            to: to.name.clone(),
            mode,
            rows,
        })
    }

    /// Traduction identité d'un zonage vers lui-même
    pub fn identity(zoning: &ZoningSystem, mode: WeightingMode) -> Self {
        let rows = zoning.zones().iter()
            .map(|z| (z.clone(), vec![(z.clone(), 1.0)]))
            .collect();
        Translation {
            from: zoning.name.clone(),
            to: zoning.name.clone(),
            mode,
            rows,
        }
    }

    /// Poids sortants d'une zone source (vide si la zone n'est pas couverte)
    pub fn row_weights(&self, from_zone: &str) -> &[(String, f64)] {
        self.rows.get(from_zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Zones sources présentes dans la matrice
    pub fn source_zones(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Composition : (self : A → B) puis (next : B → C) donne A → C.
    ///
    /// w(a, c) = Σ_b w(a, b) · w(b, c)
    pub fn compose(&self, next: &Translation) -> Result<Translation> {
        if self.to != next.from {
            return Err(ReconcileError::ZoningMismatch {
                left: self.to.clone(),
                right: next.from.clone(),
            });
        }
        let mut rows = BTreeMap::new();
        for (a, row) in &self.rows {
            let mut acc: BTreeMap<String, f64> = BTreeMap::new();
            for (b, w_ab) in row {
                for (c, w_bc) in next.row_weights(b) {
                    *acc.entry(c.clone()).or_insert(0.0) += w_ab * w_bc;
                }
            }
            rows.insert(a.clone(), acc.into_iter().collect());
        }
        Ok(Translation {
            from: self.from.clone(),
            to: next.to.clone(),
            mode: self.mode,
            rows,
        })
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "translation {} -> {} ({}) = {{", self.from, self.to, self.mode)?;
        for (a, row) in &self.rows {
            for (b, w) in row {
                writeln!(f, "  {} -> {} : {}", a, b, w)?;
            }
        }
        write!(f, "}}")
    }
}
