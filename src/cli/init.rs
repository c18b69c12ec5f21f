use super::{load_or_default, open_stores, CliError};
use crate::seed;
use std::path::PathBuf;
use tracing::info;

/// Create both database files with the route schema, optionally loading
/// deterministic sample data into the operational store.
pub async fn init(config_path: Option<PathBuf>, seed: bool) -> Result<(), CliError> {
    let config = load_or_default(config_path)?;
    let (operational, analytics) = open_stores(&config)?;

    info!(path = %config.operational.path.display(), "initializing operational store");
    operational.init_schema().await?;

    info!(path = %config.analytics.path.display(), "initializing analytics store");
    analytics.init_schema().await?;

    if seed {
        let months = config.replicator.seed_months;
        let records = seed::generate_routes(months);
        info!(rows = records.len(), months, "seeding operational store");
        operational.insert_routes(&records).await?;
        println!(
            "Seeded {} rows ({} months of history) into {}",
            records.len(),
            months,
            config.operational.table
        );
    }

    println!("Stores initialized.");
    println!("  operational: {}", config.operational.path.display());
    println!("  analytics:   {}", config.analytics.path.display());
    Ok(())
}
