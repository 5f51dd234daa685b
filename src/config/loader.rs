// =============================================================================
// LOADER — Recherche, lecture et surcharge de la configuration
// =============================================================================
//
// Ordre de recherche du fichier :
//   1. chemin explicite passé à `load_config`
//   2. variable SEGZONE_CONFIG_PATH
//   3. ./segzone.toml, puis les répertoires parents (jusqu'à 3 niveaux)
//
// Surcharges par variables d'environnement, appliquées APRÈS le TOML :
//   SEGZONE_TOLERANCE  → reconcile.tolerance
//   SEGZONE_LOG_LEVEL  → reconcile.log_level
//
// =============================================================================

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{validate_config, ConfigError, ConfigResult, SegzoneConfig, CONFIG_FILE_NAME};

pub const ENV_CONFIG_PATH: &str = "SEGZONE_CONFIG_PATH";
pub const ENV_TOLERANCE: &str = "SEGZONE_TOLERANCE";
pub const ENV_LOG_LEVEL: &str = "SEGZONE_LOG_LEVEL";

/// Cherche le fichier de configuration.
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "{} désigne un fichier absent : {}", ENV_CONFIG_PATH, path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        let mut current = Some(cwd.as_path());
        for _ in 0..4 {
            let Some(dir) = current else { break };
            search_paths.push(dir.join(CONFIG_FILE_NAME));
            current = dir.parent();
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths.iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' introuvable dans :\n{}\n(définir {} pour un autre emplacement)",
        CONFIG_FILE_NAME, search_list, ENV_CONFIG_PATH
    )))
}

/// Charge, surcharge et valide la configuration.
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<SegzoneConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    debug!(path = %config_file.display(), "lecture de la configuration");

    let content = fs::read_to_string(&config_file)?;
    let mut config = SegzoneConfig::from_toml_str(&content)?;
    apply_environment_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Applique les variables d'environnement SEGZONE_*.
pub fn apply_environment_overrides(config: &mut SegzoneConfig) {
    apply_overrides_from(config, |key| env::var(key).ok());
}

/// Applique des surcharges lues par `lookup` (variables d'environnement
/// en pratique, table fixe en test).
pub fn apply_overrides_from<F>(config: &mut SegzoneConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_TOLERANCE) {
        match value.trim().parse::<f64>() {
            Ok(tolerance) => config.reconcile.tolerance = tolerance,
            Err(_) => warn!(variable = ENV_TOLERANCE, value = %value, "surcharge ignorée : nombre attendu"),
        }
    }
    if let Some(value) = lookup(ENV_LOG_LEVEL) {
        config.reconcile.log_level = value;
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_overrides_from_table() {
        let mut config = SegzoneConfig::default();
        let vars = HashMap::from([
            (ENV_TOLERANCE, "1e-4".to_string()),
            (ENV_LOG_LEVEL, "debug".to_string()),
        ]);
        apply_overrides_from(&mut config, |k| vars.get(k).cloned());
        assert_eq!(config.reconcile.tolerance, 1e-4);
        assert_eq!(config.reconcile.log_level, "debug");
    }

    #[test]
    fn test_unparsable_tolerance_is_ignored() {
        let mut config = SegzoneConfig::default();
        apply_overrides_from(&mut config, |k| (k == ENV_TOLERANCE).then(|| "beaucoup".to_string()));
        assert_eq!(config.reconcile.tolerance, SegzoneConfig::default().reconcile.tolerance);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reconcile]\ntolerance = 0.001\n\n[[zoning]]\nname = \"z\"\nzones = [\"a\", \"b\"]").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.zoning[0].zones, vec!["a", "b"]);
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[reconcile]\ntolerance = -1.0\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(Some(&dir.path().join("absent.toml"))),
            Err(ConfigError::Io(_))
        ));
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[reconcile\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse(_))));
    }
}
