// =============================================================================
// SEGZONE — Point d'entrée : démonstration de la réconciliation
// =============================================================================
//
// Charge la configuration, installe les logs, puis déroule le pipeline
// de `segzone::demo` sur la chaîne LSOA ⊂ MSOA ⊂ LAD.
//
// Usage : segzone [chemin/vers/segzone.toml]
//
// =============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use segzone::config::load_config;
use segzone::demo;

fn main() -> ExitCode {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = match load_config(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.reconcile.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match demo::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "démonstration interrompue");
            ExitCode::FAILURE
        }
    }
}
