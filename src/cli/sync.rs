use super::{load_or_default, open_stores, CliError};
use crate::replicator::Replicator;
use crate::store::{SourceStore, TargetStore, WatermarkStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// Replicate from the operational store to the analytics store. With `once`
/// set, a single run executes and the command exits non-zero on failure;
/// otherwise a loop runs until Ctrl+C.
pub async fn sync(
    config_path: Option<PathBuf>,
    once: bool,
    interval_override: Option<Duration>,
) -> Result<(), CliError> {
    let config = load_or_default(config_path)?;
    let (operational, analytics) = open_stores(&config)?;

    operational.init_schema().await?;
    analytics.init_schema().await?;

    let replicator = Replicator::new(
        operational.clone() as Arc<dyn SourceStore>,
        analytics.clone() as Arc<dyn TargetStore>,
        // The watermark lives beside the replicated rows so a restored
        // analytics database never claims rows it does not hold.
        analytics.clone() as Arc<dyn WatermarkStore>,
        config.replicator.batch_size,
    );

    if once {
        let report = replicator.run_once().await?;
        println!(
            "Run {} complete: {} rows in {:?}",
            report.run_id, report.rows_written, report.duration
        );
        if let Some(watermark) = report.end_watermark {
            println!("Watermark advanced to {}", watermark);
        } else {
            println!("No changed rows; watermark unchanged.");
        }
        return Ok(());
    }

    let interval = interval_override.unwrap_or(config.replicator.interval);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!(interval_secs = interval.as_secs(), "starting continuous sync, press Ctrl+C to stop");

    let signal_task = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    replicator.run_forever(interval, shutdown_rx).await?;
    signal_task.abort();

    println!(
        "Sync stopped after {} runs, {} records replicated.",
        replicator.runs_completed(),
        replicator.records_replicated()
    );
    Ok(())
}
