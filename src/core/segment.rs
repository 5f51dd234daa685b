// =============================================================================
// SEGMENT — Un axe catégoriel nommé (âge, genre, type de logement...)
// =============================================================================
//
// Un Segment est un ensemble FINI et ÉNUMÉRÉ de valeurs :
//   - chaque valeur est un CODE entier (ce qui circule dans les clés)
//   - chaque code a un LIBELLÉ lisible (ce qui s'affiche)
//
// La table code → libellé est une donnée (elle peut venir de la
// configuration), mais les codes manipulés par le cœur sont toujours
// vérifiés contre cette table.
//
// EXCLUSIONS :
//   Un segment peut déclarer des combinaisons STRUCTURELLEMENT INVALIDES
//   avec un autre segment. Exemple :
//
//     age = "moins de 16 ans"  exclut  emploi ∈ { temps plein, temps partiel }
//
//   Ces cellules n'existent pas dans l'espace des clés : elles ne reçoivent
//   jamais de part lors d'une répartition.
//
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;

use super::error::{ReconcileError, Result};

/// Règle d'exclusion portée par un segment.
///
/// Lue ainsi : quand CE segment vaut `own_value`, le segment
/// `other_segment` ne peut pas prendre une valeur de `other_values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub other_segment: String,
    pub own_value: i64,
    pub other_values: Vec<i64>,
}

impl Exclusion {
    /// La combinaison (own, other) est-elle interdite par cette règle ?
    pub fn forbids(&self, own: i64, other: i64) -> bool {
        own == self.own_value && self.other_values.contains(&other)
    }
}

/// Un axe catégoriel : nom + table code → libellé + exclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    values: BTreeMap<i64, String>,
    exclusions: Vec<Exclusion>,
}

impl Segment {
    /// Crée un segment vide
    pub fn new(name: &str) -> Self {
        Segment {
            name: name.to_string(),
            values: BTreeMap::new(),
            exclusions: Vec::new(),
        }
    }

    /// Segment dont les codes sont `codes` et les libellés leur texte.
    pub fn with_codes(name: &str, codes: impl IntoIterator<Item = i64>) -> Self {
        let mut segment = Segment::new(name);
        for code in codes {
            segment.values.insert(code, code.to_string());
        }
        segment
    }

    /// Ajoute (ou renomme) une valeur
    pub fn add_value(&mut self, code: i64, label: &str) -> &mut Self {
        self.values.insert(code, label.to_string());
        self
    }

    /// Déclare qu'avec `own_value`, `other_segment` ne peut valoir aucun de `other_values`.
    pub fn add_exclusion(&mut self, other_segment: &str, own_value: i64, other_values: &[i64]) -> &mut Self {
        self.exclusions.push(Exclusion {
            other_segment: other_segment.to_string(),
            own_value,
            other_values: other_values.to_vec(),
        });
        self
    }

    /// Les codes, dans l'ordre croissant
    pub fn codes(&self) -> impl Iterator<Item = i64> + '_ {
        self.values.keys().copied()
    }

    pub fn label(&self, code: i64) -> Option<&str> {
        self.values.get(&code).map(String::as_str)
    }

    pub fn contains(&self, code: i64) -> bool {
        self.values.contains_key(&code)
    }

    /// Vérifie qu'un code appartient bien à ce segment.
    pub fn check(&self, code: i64) -> Result<i64> {
        if self.contains(code) {
            Ok(code)
        } else {
            Err(ReconcileError::UnknownSegmentValue {
                segment: self.name.clone(),
                value: code,
            })
        }
    }

    /// Nombre de valeurs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    /// Exclusions de ce segment qui visent `other`.
    pub fn exclusions_against<'a>(&'a self, other: &'a str) -> impl Iterator<Item = &'a Exclusion> + 'a {
        self.exclusions.iter().filter(move |e| e.other_segment == other)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values.iter()
            .map(|(code, label)| {
                if label == &code.to_string() {
                    code.to_string()
                } else {
                    format!("{}={}", code, label)
                }
            })
            .collect();
        write!(f, "{} [{}]", self.name, values.join(", "))
    }
}
