//! Configuration loading for the flightlake tools.
//!
//! Config is YAML with `$env{VAR}` expansion and tilde-expanded paths.
//! Resolution order: explicit `--config`, then
//! `~/.config/flightlake/config.yml`, then `/etc/flightlake/config.yml`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("environment variable(s) not set: {0}")]
    UnsetEnvVars(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub operational: StoreConfig,
    pub analytics: StoreConfig,
    pub replicator: ReplicatorConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

/// One side of the replication pair: a database file and the route table
/// inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatorConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
    #[serde(default = "default_seed_months")]
    pub seed_months: u32,
}

fn default_batch_size() -> usize {
    10_000
}

fn default_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_seed_months() -> u32 {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_warmup_runs")]
    pub warmup_runs: usize,
    #[serde(default = "default_test_runs")]
    pub test_runs: usize,
}

fn default_warmup_runs() -> usize {
    1
}

fn default_test_runs() -> usize {
    3
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_runs: default_warmup_runs(),
            test_runs: default_test_runs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operational: StoreConfig {
                path: PathBuf::from("data/operational.duckdb"),
                table: "routes_ops".to_string(),
            },
            analytics: StoreConfig {
                path: PathBuf::from("data/analytics.duckdb"),
                table: "routes_analytics".to_string(),
            },
            replicator: ReplicatorConfig {
                batch_size: default_batch_size(),
                interval: default_interval(),
                seed_months: default_seed_months(),
            },
            benchmark: BenchmarkConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let yaml = expand_env_vars(&yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;
    config.operational.path = expand_tilde(&config.operational.path);
    config.analytics.path = expand_tilde(&config.analytics.path);

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.replicator.batch_size == 0 {
        errors.push("replicator.batch_size must be greater than zero".to_string());
    }
    if config.replicator.interval.is_zero() {
        errors.push("replicator.interval must be greater than zero".to_string());
    }
    if config.benchmark.test_runs == 0 {
        errors.push("benchmark.test_runs must be greater than zero".to_string());
    }
    // Each store opens its own connection, and DuckDB takes an exclusive
    // lock per file; the watermark side table also assumes the analytics
    // database is its own file.
    if config.operational.path == config.analytics.path {
        errors.push(
            "operational and analytics stores must use different database files".to_string(),
        );
    }
    for (label, store) in [
        ("operational", &config.operational),
        ("analytics", &config.analytics),
    ] {
        if store.table.is_empty() {
            errors.push(format!("{label}.table must not be empty"));
        } else if !store
            .table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            // Table names are interpolated into SQL; keep them identifiers.
            errors.push(format!(
                "{label}.table '{}' must be a plain identifier",
                store.table
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Expands `$env{VAR_NAME}` references. Unset variables are left unchanged
/// so `check_unexpanded_vars` can report them all at once.
pub fn expand_env_vars(text: &str) -> String {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();

    re.replace_all(text, |caps: &regex::Captures| {
        let var_name = caps.get(1).unwrap().as_str();
        std::env::var(var_name)
            .unwrap_or_else(|_| caps.get(0).unwrap().as_str().to_string())
    })
    .to_string()
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    let mut unexpanded: Vec<String> = re
        .captures_iter(yaml)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();
    Err(ConfigError::UnsetEnvVars(unexpanded.join(", ")))
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(stripped) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(stripped);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// First existing config path: explicit flag, user config, system config.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/flightlake/config.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/flightlake/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
