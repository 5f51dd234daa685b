// =============================================================================
// CONFIG — Configuration TOML : tolérances, segments, zonages
// =============================================================================
//
// La configuration rend DÉCLARATIVES les tables que le cœur manipule :
//
// ```toml
// [reconcile]
// tolerance = 1e-9
// log_level = "info"
//
// [[segments]]
// name = "age"
// values = [{ code = 1, label = "0-15" }, { code = 2, label = "16-74" }]
// exclusions = [{ other_segment = "emp", own_value = 1, other_values = [1, 2] }]
//
// [[zoning]]
// name = "msoa"
// zones = ["m1", "m2"]
//
// [[lookup]]
// from = "lsoa"
// to = "msoa"
// pairs = [["l1", "m1"], ["l2", "m2"]]
// ```
//
// Ordre de priorité : fichier TOML, puis variables d'environnement.
//
// =============================================================================

pub mod loader;
pub mod validation;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::ReconcileError;
use crate::core::registry::ZoneSystemRegistry;
use crate::core::segment::Segment;
use crate::core::segmentation::Segmentation;
use crate::core::validate::validate_translation;
use crate::core::zoning::{Translation, ZoningSystem};

pub use loader::{apply_environment_overrides, apply_overrides_from, find_config_file, load_config};
pub use validation::validate_config;

/// Nom du fichier de configuration recherché
pub const CONFIG_FILE_NAME: &str = "segzone.toml";

/// Erreurs de configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Fichier de configuration introuvable : {0}")]
    FileNotFound(String),

    #[error("Lecture du fichier de configuration impossible : {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML invalide : {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration invalide : {0}")]
    Validation(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Configuration complète
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegzoneConfig {
    pub reconcile: ReconcileConfig,
    pub segments: Vec<SegmentConfig>,
    pub zoning: Vec<ZoningConfig>,
    pub lookup: Vec<LookupConfig>,
}

/// Réglages numériques et journalisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub tolerance: f64,
    pub log_level: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            tolerance: crate::core::registry::DEFAULT_TOLERANCE,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentValueConfig {
    pub code: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    pub other_segment: String,
    pub own_value: i64,
    pub other_values: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub name: String,
    pub values: Vec<SegmentValueConfig>,
    #[serde(default)]
    pub exclusions: Vec<ExclusionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoningConfig {
    pub name: String,
    pub zones: Vec<String>,
}

/// Correspondance « plusieurs vers un » entre deux zonages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    pub from: String,
    pub to: String,
    pub pairs: Vec<(String, String)>,
}

impl SegmentConfig {
    /// Construit le Segment correspondant
    pub fn to_segment(&self) -> Segment {
        let mut segment = Segment::new(&self.name);
        for value in &self.values {
            segment.add_value(value.code, &value.label);
        }
        for rule in &self.exclusions {
            segment.add_exclusion(&rule.other_segment, rule.own_value, &rule.other_values);
        }
        segment
    }
}

impl SegzoneConfig {
    /// Parse une configuration depuis du texte TOML (sans surcharges)
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Tous les segments déclarés, par nom
    pub fn segment_catalogue(&self) -> BTreeMap<String, Segment> {
        self.segments.iter()
            .map(|s| (s.name.clone(), s.to_segment()))
            .collect()
    }

    /// Segmentation formée des segments nommés, dans l'ordre donné
    pub fn segmentation(&self, names: &[&str]) -> ConfigResult<Segmentation> {
        let catalogue = self.segment_catalogue();
        let mut segments = Vec::with_capacity(names.len());
        for name in names {
            let segment = catalogue.get(*name)
                .ok_or_else(|| ReconcileError::UnknownSegment(name.to_string()))?;
            segments.push(segment.clone());
        }
        Ok(Segmentation::new(segments)?)
    }

    /// Registre peuplé des zonages et des correspondances déclarés.
    ///
    /// Chaque correspondance doit couvrir toutes les zones de son zonage source.
    pub fn build_registry(&self) -> ConfigResult<ZoneSystemRegistry> {
        let mut registry = ZoneSystemRegistry::with_tolerance(self.reconcile.tolerance);
        for zoning in &self.zoning {
            registry.register(ZoningSystem::new(&zoning.name, &zoning.zones)?)?;
        }
        for lookup in &self.lookup {
            let from = registry.get(&lookup.from)?;
            let to = registry.get(&lookup.to)?;
            let pairs: Vec<(&str, &str)> = lookup.pairs.iter()
                .map(|(a, b)| (a.as_str(), b.as_str()))
                .collect();
            let translation = Translation::from_lookup(&from, &to, &pairs)?;
            if let Err(errors) = validate_translation(&translation, &from, registry.tolerance()) {
                let lines: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                return Err(ConfigError::Validation(lines.join("\n")));
            }
            registry.register_translation(translation)?;
        }
        Ok(registry)
    }
}
