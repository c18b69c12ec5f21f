//! Result comparison and formatting helpers for the benchmark harness.

use crate::store::duckdb::QueryOutput;
use serde_json::Value;
use std::time::Duration;

const FLOAT_TOLERANCE: f64 = 1e-3;

/// Order-insensitive equality of two result sets, with a small tolerance for
/// floating-point aggregates so the two engines' rounding does not register
/// as a mismatch.
pub fn results_match(a: &QueryOutput, b: &QueryOutput) -> bool {
    if a.rows.len() != b.rows.len() {
        return false;
    }

    let mut rows_a: Vec<&Vec<Value>> = a.rows.iter().collect();
    let mut rows_b: Vec<&Vec<Value>> = b.rows.iter().collect();
    rows_a.sort_by_key(|row| row_sort_key(row));
    rows_b.sort_by_key(|row| row_sort_key(row));

    rows_a
        .iter()
        .zip(rows_b.iter())
        .all(|(ra, rb)| rows_equal(ra, rb))
}

fn row_sort_key(row: &[Value]) -> String {
    let parts: Vec<String> = row.iter().map(|v| v.to_string()).collect();
    parts.join("\u{1f}")
}

fn rows_equal(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(va, vb)| values_equal(va, vb))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(fa), Some(fb)) => (fa - fb).abs() <= FLOAT_TOLERANCE,
        _ => a == b,
    }
}

/// Ratio of baseline to candidate time. Greater than 1.0 means the candidate
/// was faster.
pub fn speedup(baseline: Duration, candidate: Duration) -> f64 {
    let candidate_secs = candidate.as_secs_f64();
    if candidate_secs == 0.0 {
        return f64::INFINITY;
    }
    baseline.as_secs_f64() / candidate_secs
}

/// Human-readable duration: microseconds below a millisecond, milliseconds
/// below a second, seconds above.
pub fn format_elapsed(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        format!("{:.0}\u{3bc}s", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else {
        format!("{:.3}s", secs)
    }
}
