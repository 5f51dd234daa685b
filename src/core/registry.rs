// =============================================================================
// REGISTRY — Le registre explicite des zonages et des traductions
// =============================================================================
//
// Les zonages sont RECHERCHÉS PAR NOM et jamais modifiés. Plutôt qu'un cache
// global, le registre est un objet passé explicitement aux opérations qui en
// ont besoin :
//
//   registry.get_or_create("msoa", || charger_msoa())
//
// Il connaît aussi les traductions enregistrées. Quand aucune traduction
// directe A → C n'existe, il cherche une CHAÎNE de traductions enregistrées
// (parcours en largeur) et la compose :
//
//   lsoa → msoa → lad      ⇒      lsoa → lad
//
// =============================================================================

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use super::error::{ReconcileError, Result};
use super::zoning::{Translation, WeightingMode, ZoningSystem};

/// Tolérance par défaut des comparaisons de poids
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

type TranslationKey = (String, String, WeightingMode);

/// Registre des zonages (par nom) et des traductions (par couple + mode).
#[derive(Debug, Clone)]
pub struct ZoneSystemRegistry {
    zonings: HashMap<String, Arc<ZoningSystem>>,
    translations: HashMap<TranslationKey, Arc<Translation>>,
    tolerance: f64,
}

impl Default for ZoneSystemRegistry {
    fn default() -> Self {
        ZoneSystemRegistry::new()
    }
}

impl ZoneSystemRegistry {
    pub fn new() -> Self {
        ZoneSystemRegistry::with_tolerance(DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        ZoneSystemRegistry {
            zonings: HashMap::new(),
            translations: HashMap::new(),
            tolerance,
        }
    }

    /// Tolérance utilisée pour « poids == 1 »
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Retourne le zonage s'il est connu, sinon l'obtient via `loader` et le garde.
    ///
    /// Le zonage chargé doit porter le nom demandé.
    pub fn get_or_create<F>(&mut self, name: &str, loader: F) -> Result<Arc<ZoningSystem>>
    where
        F: FnOnce() -> Result<ZoningSystem>,
    {
        if let Some(existing) = self.zonings.get(name) {
            return Ok(Arc::clone(existing));
        }
        let zoning = loader()?;
        if zoning.name != name {
            return Err(ReconcileError::InvalidDefinition(format!(
                "le chargeur de '{}' a produit le zonage '{}'", name, zoning.name
            )));
        }
        debug!(zoning = name, zones = zoning.len(), "zonage chargé");
        let zoning = Arc::new(zoning);
        self.zonings.insert(name.to_string(), Arc::clone(&zoning));
        Ok(zoning)
    }

    /// Enregistre un zonage déjà construit.
    ///
    /// Réenregistrer un zonage identique est sans effet ; un zonage différent
    /// sous le même nom est refusé.
    pub fn register(&mut self, zoning: ZoningSystem) -> Result<Arc<ZoningSystem>> {
        if let Some(existing) = self.zonings.get(&zoning.name) {
            if **existing == zoning {
                return Ok(Arc::clone(existing));
            }
            return Err(ReconcileError::InvalidDefinition(format!(
                "un autre zonage nommé '{}' est déjà enregistré", zoning.name
            )));
        }
        let name = zoning.name.clone();
        let zoning = Arc::new(zoning);
        self.zonings.insert(name, Arc::clone(&zoning));
        Ok(zoning)
    }

    pub fn get(&self, name: &str) -> Result<Arc<ZoningSystem>> {
        self.zonings.get(name)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownZoning(name.to_string()))
    }

    pub fn zoning_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.zonings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Enregistre une traduction entre deux zonages connus du registre.
    pub fn register_translation(&mut self, translation: Translation) -> Result<()> {
        self.get(&translation.from)?;
        self.get(&translation.to)?;
        let key = (translation.from.clone(), translation.to.clone(), translation.mode);
        self.translations.insert(key, Arc::new(translation));
        Ok(())
    }

    /// Traduction `from → to` pour un mode donné.
    ///
    /// Ordre de recherche : identité, traduction directe, chaîne composée.
    pub fn translation(&self, from: &str, to: &str, mode: WeightingMode) -> Result<Arc<Translation>> {
        if from == to {
            let zoning = self.get(from)?;
            return Ok(Arc::new(Translation::identity(&zoning, mode)));
        }
        let key = (from.to_string(), to.to_string(), mode);
        if let Some(direct) = self.translations.get(&key) {
            return Ok(Arc::clone(direct));
        }

        let path = self.find_chain(from, to, mode).ok_or_else(|| {
            ReconcileError::TranslationNotFound {
                from: from.to_string(),
                to: to.to_string(),
                mode: mode.to_string(),
            }
        })?;
        debug!(from, to, steps = path.len(), "traduction composée");

        let mut composed = (*path[0]).clone();
        for step in &path[1..] {
            composed = composed.compose(step)?;
        }
        Ok(Arc::new(composed))
    }

    /// Parcours en largeur sur les traductions enregistrées du mode donné.
    fn find_chain(&self, from: &str, to: &str, mode: WeightingMode) -> Option<Vec<Arc<Translation>>> {
        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue: VecDeque<(&str, Vec<Arc<Translation>>)> = VecDeque::from([(from, Vec::new())]);

        while let Some((current, path)) = queue.pop_front() {
            for ((a, b, m), translation) in &self.translations {
                if a != current || *m != mode || visited.contains(b.as_str()) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(Arc::clone(translation));
                if b == to {
                    return Some(next_path);
                }
                visited.insert(b.as_str());
                queue.push_back((b.as_str(), next_path));
            }
        }
        None
    }
}
