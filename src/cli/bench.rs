use super::{load_or_default, open_stores, CliError};
use crate::bench::{compare, BenchConfig, BenchReport, BenchmarkRunner};
use std::path::PathBuf;
use std::time::Duration;

/// Run the query catalog against both stores and print a comparison table.
/// With `output` set, the full report is also written as JSON.
pub async fn bench(
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_or_default(config_path)?;
    let (operational, analytics) = open_stores(&config)?;

    let runner = BenchmarkRunner::new(
        operational,
        analytics,
        BenchConfig {
            warmup_runs: config.benchmark.warmup_runs,
            test_runs: config.benchmark.test_runs,
        },
    );

    let report = runner.run().await?;
    print_report(&report);

    if let Some(path) = output {
        report.save_json(&path)?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &BenchReport) {
    println!(
        "\nStorage: operational {} rows, analytics {} rows",
        report.storage.operational_rows, report.storage.analytics_rows
    );

    println!(
        "\n{:<22} {:>12} {:>12} {:>9} {:>7} {}",
        "query", "operational", "analytics", "speedup", "match", "winner"
    );
    for result in &report.results {
        println!(
            "{:<22} {:>12} {:>12} {:>8.1}x {:>7} {}",
            result.key,
            compare::format_elapsed(Duration::from_secs_f64(result.operational_secs)),
            compare::format_elapsed(Duration::from_secs_f64(result.analytics_secs)),
            result.speedup,
            if result.results_match { "yes" } else { "NO" },
            result.winner,
        );
    }

    println!(
        "\nAverage speedup: {:.1}x, analytics won {}/{} queries",
        report.avg_speedup(),
        report.analytics_wins(),
        report.results.len()
    );

    if !report.all_match() {
        println!("Warning: result sets differ between engines. Is the analytics store synced?");
    }
}
