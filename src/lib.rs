// =============================================================================
// SEGZONE — Réconciliation de données zonales segmentées en Rust
// =============================================================================
//
// Segzone manipule des tableaux numériques à N dimensions catégorielles
// (âge, genre, type de logement, statut d'emploi...) plus un axe
// géographique (le zonage), pour que deux tableaux de segmentations et de
// zonages DIFFÉRENTS puissent être combinés, comparés et recalés sur des
// totaux de contrôle.
//
// Architecture :
//   core/     → Le cœur de réconciliation pur (aucune I/O)
//   config/   → Chargement de la configuration TOML (segments, zonages)
//   demo      → Pipeline de démonstration (utilisé par le binaire)
//
// Concepts fondamentaux :
//   Segment       = un axe catégoriel énuméré (avec exclusions)
//   Segmentation  = la liste ordonnée des axes d'un tableau
//   Zonage        = une partition nommée de la zone d'étude
//   Traduction    = les poids de recouvrement entre deux zonages
//   Expansion / réduction, proportions, recalage = les opérations
//
// =============================================================================

pub mod core;
pub mod config;
pub mod demo;

pub use crate::core::array::SegmentedArray;
pub use crate::core::compat::{find_common_zoning, is_strict_aggregation, translate_to_common_zoning};
pub use crate::core::error::{ReconcileError, Result};
pub use crate::core::mask::{replace_segment_combination, MatchMode, SegmentCombination};
pub use crate::core::matcher::{is_strict_subset, segmentation_difference, segments, union_segmentation};
pub use crate::core::migrate::{collapse_to_match, expand_to_match, SplitMethod};
pub use crate::core::proportion::{apply_proportions, derive_proportions};
pub use crate::core::rebalance::{match_target_total, rebalance_zone_totals, DesiredTotals};
pub use crate::core::registry::ZoneSystemRegistry;
pub use crate::core::segment::{Exclusion, Segment};
pub use crate::core::segmentation::{SegmentKey, Segmentation};
pub use crate::core::zoning::{Translation, WeightingMode, ZoningSystem};
