// =============================================================================
// VALIDATE — Vérification de la cohérence des structures
// =============================================================================
//
// Ce module vérifie que les structures respectent leurs invariants :
//   - une Segmentation a des exclusions qui visent des valeurs existantes
//     et un espace de clés non vide
//   - une Translation couvre chaque zone source sans dépasser un poids total de 1
//   - un SegmentedArray ne contient que des clés valides et des valeurs finies
//
// Comme pour les schémas, on collecte TOUTES les erreurs plutôt que de
// s'arrêter à la première.
//
// =============================================================================

use thiserror::Error;

use super::array::SegmentedArray;
use super::segmentation::Segmentation;
use super::zoning::{Translation, ZoningSystem};

/// Erreur de validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error: {message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    fn new(message: String) -> Self {
        ValidationError { message }
    }
}

fn collect(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Vérifie les exclusions d'une segmentation.
///
/// Conditions :
/// - une exclusion ne vise pas son propre segment
/// - la valeur propre existe dans le segment
/// - si le segment visé est présent, les valeurs visées y existent
/// - il reste au moins une clé valide
pub fn validate_segmentation(segmentation: &Segmentation) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for segment in segmentation.segments() {
        for rule in segment.exclusions() {
            if rule.other_segment == segment.name {
                errors.push(ValidationError::new(format!(
                    "Segment '{}' : une exclusion vise le segment lui-même", segment.name
                )));
                continue;
            }
            if !segment.contains(rule.own_value) {
                errors.push(ValidationError::new(format!(
                    "Segment '{}' : la valeur exclue {} n'existe pas", segment.name, rule.own_value
                )));
            }
            if let Some(other) = segmentation.get(&rule.other_segment) {
                for value in &rule.other_values {
                    if !other.contains(*value) {
                        errors.push(ValidationError::new(format!(
                            "Segment '{}' : la valeur {} n'existe pas dans '{}'",
                            segment.name, value, other.name
                        )));
                    }
                }
            }
        }
    }

    if !segmentation.is_empty() && segmentation.keys().is_empty() {
        errors.push(ValidationError::new(
            "Les exclusions ne laissent aucune clé valide".to_string()
        ));
    }

    collect(errors)
}

/// Vérifie une traduction par rapport à son zonage source.
///
/// Chaque zone source doit être couverte, et ses poids ne doivent pas
/// dépasser 1 (la somme peut être inférieure quand le recouvrement est partiel).
pub fn validate_translation(
    translation: &Translation,
    from: &ZoningSystem,
    tolerance: f64,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if translation.from != from.name {
        errors.push(ValidationError::new(format!(
            "Traduction depuis '{}' vérifiée contre le zonage '{}'", translation.from, from.name
        )));
        return collect(errors);
    }

    for zone in from.zones() {
        let row = translation.row_weights(zone);
        if row.is_empty() {
            errors.push(ValidationError::new(format!(
                "Zone '{}' non couverte par la traduction {} -> {}", zone, translation.from, translation.to
            )));
            continue;
        }
        let sum: f64 = row.iter().map(|(_, w)| w).sum();
        if sum > 1.0 + tolerance {
            errors.push(ValidationError::new(format!(
                "Zone '{}' : poids total {} supérieur à 1", zone, sum
            )));
        }
    }

    for zone in translation.source_zones() {
        if from.zone_index(zone).is_none() {
            errors.push(ValidationError::new(format!(
                "Zone source '{}' inconnue du zonage '{}'", zone, from.name
            )));
        }
    }

    collect(errors)
}

/// Vérifie les invariants d'un tableau segmenté.
pub fn validate_array(array: &SegmentedArray) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let segmentation = array.segmentation();

    for key in array.keys() {
        if !segmentation.is_valid_key(key) {
            errors.push(ValidationError::new(format!(
                "Clé {:?} hors de l'espace des clés", key
            )));
        }
    }

    let (rows, columns) = array.data().dim();
    if rows != array.keys().len() || columns != array.zoning().len() {
        errors.push(ValidationError::new(format!(
            "Forme {:?} incohérente avec {} clés × {} zones",
            (rows, columns), array.keys().len(), array.zoning().len()
        )));
    }

    let non_finite = array.non_finite_count();
    if non_finite > 0 {
        errors.push(ValidationError::new(format!(
            "{} cellule(s) non finie(s)", non_finite
        )));
    }

    collect(errors)
}
