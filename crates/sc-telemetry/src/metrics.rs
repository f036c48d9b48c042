//! Prometheus metrics for the Shardcache core.
//!
//! All metrics follow the naming convention: `sc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., corrupt_spans_repaired_total)
//! - **Gauge**: Value that can go up or down (e.g., pending_transactions)
//! - **Histogram**: Distribution of values (e.g., apply_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // RELIABLE STORAGE METRICS
    // =========================================================================

    /// Blocks written, by write mode
    pub static ref BLOCKS_WRITTEN: CounterVec = CounterVec::new(
        Opts::new("sc_storage_blocks_written_total", "Blocks written to reliable storage"),
        &["mode"]  // mode: in_place/append
    ).expect("metric creation failed");

    /// Blocks logically deleted
    pub static ref BLOCKS_DELETED: Counter = Counter::new(
        "sc_storage_blocks_deleted_total",
        "Total number of blocks marked deleted"
    ).expect("metric creation failed");

    /// Unparseable regions overwritten with a dirty block during load
    pub static ref CORRUPT_SPANS_REPAIRED: Counter = Counter::new(
        "sc_storage_corrupt_spans_repaired_total",
        "Corrupted storage spans replaced by dirty blocks"
    ).expect("metric creation failed");

    /// Blocks restored from the backup mirror
    pub static ref BLOCKS_RECOVERED_FROM_BACKUP: Counter = Counter::new(
        "sc_storage_blocks_recovered_from_backup_total",
        "Blocks lost to corruption and restored from backup storage"
    ).expect("metric creation failed");

    /// Full storage compactions
    pub static ref STORAGE_COMPACTIONS: Counter = Counter::new(
        "sc_storage_compactions_total",
        "Total number of storage compactions"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTION LOG METRICS
    // =========================================================================

    /// Transactions appended to the log
    pub static ref TRANSACTIONS_LOGGED: Counter = Counter::new(
        "sc_txlog_transactions_logged_total",
        "Total transactions appended to the transaction log"
    ).expect("metric creation failed");

    /// Delayed transactions canceled before processing
    pub static ref TRANSACTIONS_CANCELED: Counter = Counter::new(
        "sc_txlog_transactions_canceled_total",
        "Total delayed transactions canceled"
    ).expect("metric creation failed");

    /// Transactions waiting in the log
    pub static ref PENDING_TRANSACTIONS: Gauge = Gauge::new(
        "sc_txlog_pending_transactions",
        "Transactions queued and not yet processed"
    ).expect("metric creation failed");

    // =========================================================================
    // PERSISTENCE METRICS
    // =========================================================================

    /// Transactions applied to storage by the background thread
    pub static ref TRANSACTIONS_APPLIED: Counter = Counter::new(
        "sc_persistence_transactions_applied_total",
        "Total transactions applied to reliable storage"
    ).expect("metric creation failed");

    /// Apply failures swallowed by the background thread (for alerting)
    pub static ref APPLY_FAILURES: Counter = Counter::new(
        "sc_persistence_apply_failures_total",
        "Transactions that failed to apply and stay in the log"
    ).expect("metric creation failed");

    /// Apply duration
    pub static ref APPLY_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "sc_persistence_apply_duration_seconds",
            "Time spent applying one transaction to storage"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // FULL-TEXT METRICS
    // =========================================================================

    /// Tokens currently excluded from the index
    pub static ref FULLTEXT_IGNORED_TOKENS: Gauge = Gauge::new(
        "sc_fulltext_ignored_tokens",
        "Tokens excluded from the full-text index"
    ).expect("metric creation failed");

    /// Full-text queries served
    pub static ref FULLTEXT_QUERIES: Counter = Counter::new(
        "sc_fulltext_queries_total",
        "Total full-text queries"
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Storage
        Box::new(BLOCKS_WRITTEN.clone()),
        Box::new(BLOCKS_DELETED.clone()),
        Box::new(CORRUPT_SPANS_REPAIRED.clone()),
        Box::new(BLOCKS_RECOVERED_FROM_BACKUP.clone()),
        Box::new(STORAGE_COMPACTIONS.clone()),
        // Transaction log
        Box::new(TRANSACTIONS_LOGGED.clone()),
        Box::new(TRANSACTIONS_CANCELED.clone()),
        Box::new(PENDING_TRANSACTIONS.clone()),
        // Persistence
        Box::new(TRANSACTIONS_APPLIED.clone()),
        Box::new(APPLY_FAILURES.clone()),
        Box::new(APPLY_DURATION.clone()),
        // Full-text
        Box::new(FULLTEXT_IGNORED_TOKENS.clone()),
        Box::new(FULLTEXT_QUERIES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
