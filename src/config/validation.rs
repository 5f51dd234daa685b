// =============================================================================
// VALIDATION — Cohérence de la configuration chargée
// =============================================================================
//
// Toutes les anomalies sont collectées puis rendues en une seule
// ConfigError::Validation, une ligne par problème.
//
// =============================================================================

use std::collections::BTreeSet;

use crate::core::segmentation::Segmentation;
use crate::core::validate::validate_segmentation;

use super::{ConfigError, ConfigResult, SegmentConfig, SegzoneConfig};

/// Valide la configuration complète.
pub fn validate_config(config: &SegzoneConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_reconcile(config, &mut errors);
    validate_segments(config, &mut errors);
    validate_zonings(config, &mut errors);

    if errors.is_empty() {
        return Ok(());
    }
    let lines = errors.iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::Validation(format!("échec de la validation :\n{}", lines)))
}

fn validate_reconcile(config: &SegzoneConfig, errors: &mut Vec<String>) {
    let tolerance = config.reconcile.tolerance;
    if !tolerance.is_finite() || tolerance <= 0.0 {
        errors.push(format!("reconcile.tolerance doit être strictement positive (reçu {})", tolerance));
    }
    if config.reconcile.log_level.trim().is_empty() {
        errors.push("reconcile.log_level est vide".to_string());
    }
}

fn validate_segments(config: &SegzoneConfig, errors: &mut Vec<String>) {
    let mut names = BTreeSet::new();
    for segment in &config.segments {
        if !names.insert(segment.name.as_str()) {
            errors.push(format!("segment '{}' déclaré deux fois", segment.name));
        }
        if segment.values.is_empty() {
            errors.push(format!("segment '{}' sans valeur", segment.name));
        }
        let mut codes = BTreeSet::new();
        for value in &segment.values {
            if !codes.insert(value.code) {
                errors.push(format!("segment '{}' : code {} en double", segment.name, value.code));
            }
        }
    }

    for segment in &config.segments {
        for rule in &segment.exclusions {
            if !names.contains(rule.other_segment.as_str()) {
                errors.push(format!(
                    "segment '{}' : exclusion vers le segment inconnu '{}'", segment.name, rule.other_segment
                ));
            }
        }
        if !segment.values.is_empty() {
            validate_exclusions(config, segment, errors);
        }
    }
}

/// Vérifie les exclusions d'un segment avec les segments qu'elles visent.
fn validate_exclusions(config: &SegzoneConfig, segment: &SegmentConfig, errors: &mut Vec<String>) {
    let mut involved = vec![segment.to_segment()];
    for rule in &segment.exclusions {
        let already = involved.iter().any(|s| s.name == rule.other_segment);
        let other = config.segments.iter()
            .find(|s| s.name == rule.other_segment && !s.values.is_empty());
        if let (false, Some(other)) = (already, other) {
            involved.push(other.to_segment());
        }
    }
    match Segmentation::new(involved) {
        Ok(segmentation) => {
            if let Err(found) = validate_segmentation(&segmentation) {
                errors.extend(found.into_iter().map(|e| e.message));
            }
        }
        Err(e) => errors.push(e.to_string()),
    }
}

fn validate_zonings(config: &SegzoneConfig, errors: &mut Vec<String>) {
    let mut names = BTreeSet::new();
    for zoning in &config.zoning {
        if !names.insert(zoning.name.as_str()) {
            errors.push(format!("zonage '{}' déclaré deux fois", zoning.name));
        }
        if zoning.zones.is_empty() {
            errors.push(format!("zonage '{}' sans zone", zoning.name));
        }
    }

    for lookup in &config.lookup {
        for side in [&lookup.from, &lookup.to] {
            if !names.contains(side.as_str()) {
                errors.push(format!(
                    "correspondance {} -> {} : zonage inconnu '{}'", lookup.from, lookup.to, side
                ));
            }
        }
        if lookup.from == lookup.to {
            errors.push(format!("correspondance de '{}' vers lui-même", lookup.from));
        }
    }
}
