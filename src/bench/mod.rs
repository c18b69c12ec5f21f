pub mod compare;

use crate::queries::{self, QueryDef};
use crate::store::duckdb::{DuckDbStore, QueryOutput};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct BenchConfig {
    /// Untimed runs before measurement, warming caches on both engines.
    pub warmup_runs: usize,
    /// Timed runs per engine; the reported latency is the average.
    pub test_runs: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            warmup_runs: 1,
            test_runs: 3,
        }
    }
}

/// Outcome of benchmarking a single catalog query on both stores.
#[derive(Debug, Clone, Serialize)]
pub struct QueryBenchmark {
    pub key: String,
    pub name: String,
    pub category: String,
    pub operational_secs: f64,
    pub analytics_secs: f64,
    pub speedup: f64,
    pub rows_returned: usize,
    pub results_match: bool,
    pub winner: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageSummary {
    pub operational_rows: usize,
    pub analytics_rows: usize,
    pub operational_bytes: Option<u64>,
    pub analytics_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub generated_at: DateTime<Utc>,
    pub storage: StorageSummary,
    pub results: Vec<QueryBenchmark>,
}

impl BenchReport {
    pub fn avg_speedup(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.results.iter().map(|r| r.speedup).sum::<f64>() / self.results.len() as f64
    }

    pub fn analytics_wins(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.winner == "analytics")
            .count()
    }

    pub fn all_match(&self) -> bool {
        self.results.iter().all(|r| r.results_match)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), BenchError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Runs every catalog query against both stores and compares latency and
/// results. Assumes the analytics store has been synced; a stale target will
/// show up as a result mismatch, not an error.
pub struct BenchmarkRunner {
    operational: Arc<DuckDbStore>,
    analytics: Arc<DuckDbStore>,
    config: BenchConfig,
}

impl BenchmarkRunner {
    pub fn new(
        operational: Arc<DuckDbStore>,
        analytics: Arc<DuckDbStore>,
        config: BenchConfig,
    ) -> Self {
        Self {
            operational,
            analytics,
            config,
        }
    }

    pub async fn run(&self) -> Result<BenchReport, BenchError> {
        let storage = self.storage_summary().await?;
        info!(
            operational_rows = storage.operational_rows,
            analytics_rows = storage.analytics_rows,
            "starting benchmark suite"
        );

        let mut results = Vec::with_capacity(queries::catalog().len());
        for query in queries::catalog() {
            results.push(self.bench_query(query).await?);
        }

        Ok(BenchReport {
            generated_at: Utc::now(),
            storage,
            results,
        })
    }

    async fn bench_query(&self, query: &QueryDef) -> Result<QueryBenchmark, BenchError> {
        let operational_sql = query.render(self.operational.table());
        let analytics_sql = query.render(self.analytics.table());

        for _ in 0..self.config.warmup_runs {
            self.operational.query_rows(&operational_sql).await?;
            self.analytics.query_rows(&analytics_sql).await?;
        }

        let (operational_time, operational_output) =
            self.timed_runs(&self.operational, &operational_sql).await?;
        let (analytics_time, analytics_output) =
            self.timed_runs(&self.analytics, &analytics_sql).await?;

        let results_match = compare::results_match(&operational_output, &analytics_output);
        if !results_match {
            warn!(
                query = query.key,
                operational_rows = operational_output.row_count(),
                analytics_rows = analytics_output.row_count(),
                "result sets differ between engines"
            );
        }

        let winner = if analytics_time <= operational_time {
            "analytics"
        } else {
            "operational"
        };

        info!(
            query = query.key,
            operational = %compare::format_elapsed(operational_time),
            analytics = %compare::format_elapsed(analytics_time),
            winner,
            "query benchmarked"
        );

        Ok(QueryBenchmark {
            key: query.key.to_string(),
            name: query.name.to_string(),
            category: query.category.to_string(),
            operational_secs: operational_time.as_secs_f64(),
            analytics_secs: analytics_time.as_secs_f64(),
            speedup: compare::speedup(operational_time, analytics_time),
            rows_returned: operational_output.row_count(),
            results_match,
            winner: winner.to_string(),
        })
    }

    async fn timed_runs(
        &self,
        store: &DuckDbStore,
        sql: &str,
    ) -> Result<(Duration, QueryOutput), BenchError> {
        let mut total = Duration::ZERO;
        let mut output = None;

        for _ in 0..self.config.test_runs.max(1) {
            let start = Instant::now();
            output = Some(store.query_rows(sql).await?);
            total += start.elapsed();
        }

        let avg = total / self.config.test_runs.max(1) as u32;
        // test_runs >= 1, so output is always populated.
        Ok((avg, output.unwrap_or_else(|| QueryOutput {
            columns: Vec::new(),
            rows: Vec::new(),
        })))
    }

    async fn storage_summary(&self) -> Result<StorageSummary, BenchError> {
        Ok(StorageSummary {
            operational_rows: self.operational.count_rows().await?,
            analytics_rows: self.analytics.count_rows().await?,
            operational_bytes: file_size(self.operational.path()),
            analytics_bytes: file_size(self.analytics.path()),
        })
    }
}

fn file_size(path: Option<&Path>) -> Option<u64> {
    path.and_then(|p| std::fs::metadata(p).ok()).map(|m| m.len())
}
