// =============================================================================
// CORE — Le cœur de réconciliation des données zonales segmentées
// =============================================================================
//
// Ce module regroupe toute la logique pure :
// pas de fichiers ni de réseau, uniquement des tableaux en mémoire,
// des segmentations et des zonages.
//
// Architecture (des feuilles vers les composants) :
//   segment       → un axe catégoriel (codes, libellés, exclusions)
//   segmentation  → la liste ordonnée des axes (= l'espace des clés)
//   zoning        → les zonages et les traductions entre eux
//   registry      → le registre explicite des zonages et traductions
//   array         → le tableau segmenté (clés × zones)
//   compat        → agrégation stricte et zonage commun
//   matcher       → comparaison des segmentations par noms
//   migrate       → expansion (≈ Δ) et réduction (≈ Σ) de segmentation
//   proportion    → application de proportions d'un tableau à un autre
//   rebalance     → recalage des totaux par zone et entre tableaux
//   mask          → réécriture d'une combinaison de segments
//   validate      → vérification des invariants
//   error         → taxonomie des erreurs
//
// =============================================================================

pub mod error;
pub mod segment;
pub mod segmentation;
pub mod zoning;
pub mod registry;
pub mod array;
pub mod compat;
pub mod matcher;
pub mod migrate;
pub mod proportion;
pub mod rebalance;
pub mod mask;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;
