pub mod bench;
pub mod config;
pub mod init;
pub mod queries;
pub mod sync;

use crate::config::{load_config, Config, ConfigError};
use crate::store::duckdb::DuckDbStore;
use crate::store::StoreError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("replication error: {0}")]
    Replicate(#[from] crate::replicator::ReplicateError),

    #[error("benchmark error: {0}")]
    Bench(#[from] crate::bench::BenchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load the config from the resolved path, or fall back to defaults with a
/// note on stderr when no config file exists anywhere.
pub fn load_or_default(config_path: Option<PathBuf>) -> Result<Config, CliError> {
    match config_path {
        Some(path) => Ok(load_config(&path)?),
        None => {
            eprintln!("No config file found, using built-in defaults.");
            eprintln!("Run 'flightlake config init' to generate one.");
            Ok(Config::default())
        }
    }
}

/// Open both stores named in the config, creating parent directories for
/// their database files as needed.
pub fn open_stores(config: &Config) -> Result<(Arc<DuckDbStore>, Arc<DuckDbStore>), CliError> {
    for store in [&config.operational, &config.analytics] {
        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let operational = Arc::new(DuckDbStore::open(
        &config.operational.path,
        &config.operational.table,
    )?);
    let analytics = Arc::new(DuckDbStore::open(
        &config.analytics.path,
        &config.analytics.table,
    )?);
    Ok((operational, analytics))
}
