// src/db/monitoring.rs

use log::{debug, error};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;

/// Глобальные метрики прогонов миграций
pub static MIGRATION_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "migration_runs_total",
        "Total number of migration runs by outcome",
        &["result"]
    )
    .expect("Failed to create MIGRATION_RUNS")
});

pub static MIGRATIONS_APPLIED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "migrations_applied_total",
        "Total number of migrations applied and committed"
    )
    .expect("Failed to create MIGRATIONS_APPLIED")
});

pub static MIGRATIONS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "migrations_skipped_total",
        "Total number of migrations skipped as already applied"
    )
    .expect("Failed to create MIGRATIONS_SKIPPED")
});

pub static MIGRATION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "migration_duration_seconds",
        "Duration of a whole migration run in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
    )
    .expect("Failed to create MIGRATION_DURATION")
});

/// Обёртка над прогоном: время + исход.
pub fn measure_migration_run<F, T, E>(f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let start = Instant::now();
    let result = f();
    let secs = start.elapsed().as_secs_f64();

    let outcome = if result.is_ok() { "success" } else { "failure" };
    MIGRATION_RUNS.with_label_values(&[outcome]).inc();
    MIGRATION_DURATION.observe(secs);

    debug!("Migration run ({}) took {:.4} seconds", outcome, secs);
    result
}

/// Экспорт метрик в текстовом формате Prometheus
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_outcomes_are_counted() {
        let ok_before = MIGRATION_RUNS.with_label_values(&["success"]).get();
        let failed_before = MIGRATION_RUNS.with_label_values(&["failure"]).get();

        let ok: Result<u8, String> = measure_migration_run(|| Ok(1));
        let failed: Result<u8, String> = measure_migration_run(|| Err("boom".into()));
        assert_eq!(ok, Ok(1));
        assert!(failed.is_err());

        // Счётчики глобальные, параллельные тесты могут их только увеличить.
        assert!(MIGRATION_RUNS.with_label_values(&["success"]).get() > ok_before);
        assert!(MIGRATION_RUNS.with_label_values(&["failure"]).get() > failed_before);
    }

    #[test]
    fn metrics_are_exported() {
        MIGRATIONS_APPLIED.inc_by(0);
        let text = gather_metrics();
        assert!(text.contains("migrations_applied_total"));
    }
}
