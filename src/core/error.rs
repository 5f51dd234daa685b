// =============================================================================
// ERROR — Taxonomie des erreurs du cœur de réconciliation
// =============================================================================
//
// Trois familles d'erreurs remontent à l'appelant :
//   - INCOMPATIBILITÉS : zonages sans raffinement commun, segmentations
//     qui ne sont pas dans la relation sous-ensemble / sur-ensemble exigée
//   - QUALITÉ DES DONNÉES : valeurs non finies, totaux manquants
//   - STRUCTURE : segment, valeur ou zone inconnus, définitions invalides
//
// Les conditions dégénérées mais récupérables (dénominateur nul, combinaison
// absente) ne sont PAS des erreurs : elles sont résolues par une politique
// documentée et signalées par un `tracing::warn!`.
//
// =============================================================================

use thiserror::Error;

/// Erreur renvoyée par les opérations de réconciliation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    /// Aucun zonage de la liste ne raffine strictement tous les autres.
    #[error("Zonages incompatibles : '{candidate}' et '{other}' ne sont pas emboîtés")]
    IncompatibleZoning {
        candidate: String,
        other: String,
    },

    /// Deux tableaux devaient partager le même zonage.
    #[error("Zonages différents : '{left}' vs '{right}' (traduire le zonage d'abord)")]
    ZoningMismatch {
        left: String,
        right: String,
    },

    /// La segmentation source n'est pas un sous-ensemble de la cible.
    #[error("Segmentation incompatible : segments absents de la cible {missing:?}")]
    SegmentationMismatch {
        missing: Vec<String>,
    },

    /// Aucun segment en commun entre la source et la cible.
    #[error("Aucun segment commun entre {source_segments:?} et {target_segments:?}")]
    NoSegmentOverlap {
        source_segments: Vec<String>,
        target_segments: Vec<String>,
    },

    /// Arithmétique élément par élément sur des tableaux non alignés.
    #[error("Tableaux incompatibles pour '{operation}' : {reason}")]
    IncompatibleArrays {
        operation: String,
        reason: String,
    },

    #[error("Segment inconnu : '{0}'")]
    UnknownSegment(String),

    #[error("Valeur {value} inconnue pour le segment '{segment}'")]
    UnknownSegmentValue {
        segment: String,
        value: i64,
    },

    #[error("Zone '{zone}' inconnue dans le zonage '{zoning}'")]
    UnknownZone {
        zoning: String,
        zone: String,
    },

    #[error("Zonage '{0}' absent du registre")]
    UnknownZoning(String),

    #[error("Aucune traduction {from} -> {to} ({mode})")]
    TranslationNotFound {
        from: String,
        to: String,
        mode: String,
    },

    /// Définition de segment, de segmentation ou de zonage mal formée.
    #[error("Définition invalide : {0}")]
    InvalidDefinition(String),

    #[error("Données non finies : {count} cellule(s) dans '{context}'")]
    NonFiniteData {
        context: String,
        count: usize,
    },

    #[error("Total cible manquant pour la zone '{0}'")]
    MissingZoneTotal(String),
}

/// Résultat des opérations du cœur.
pub type Result<T> = std::result::Result<T, ReconcileError>;
