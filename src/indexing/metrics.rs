//! Prometheus metrics for indexing runs

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec,
};

/// Indexing metrics collection
pub struct IndexingMetrics {
    /// Documents written to the engine
    pub documents_indexed: CounterVec,

    /// Batch writes attempted, by outcome
    pub batch_writes: CounterVec,

    /// Batch writes retried after a transient failure
    pub batch_retries: CounterVec,

    /// Reindex runs, by outcome
    pub runs_total: CounterVec,

    /// Reindex run duration in seconds
    pub run_duration: HistogramVec,

    /// Number of runs currently in progress
    pub running: GaugeVec,
}

impl IndexingMetrics {
    fn new() -> Self {
        Self {
            documents_indexed: register_counter_vec!(
                "search_documents_indexed_total",
                "Total number of documents written to the search engine",
                &["index_type"]
            )
            .expect("search_documents_indexed_total registers once"),

            batch_writes: register_counter_vec!(
                "search_batch_writes_total",
                "Total number of document batch writes",
                &["index_type", "outcome"]
            )
            .expect("search_batch_writes_total registers once"),

            batch_retries: register_counter_vec!(
                "search_batch_write_retries_total",
                "Total number of batch writes retried after a transient failure",
                &["index_type"]
            )
            .expect("search_batch_write_retries_total registers once"),

            runs_total: register_counter_vec!(
                "search_reindex_runs_total",
                "Total number of reindex runs",
                &["index_type", "outcome"]
            )
            .expect("search_reindex_runs_total registers once"),

            run_duration: register_histogram_vec!(
                "search_reindex_duration_seconds",
                "Reindex run duration in seconds",
                &["index_type"],
                vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 1800.0]
            )
            .expect("search_reindex_duration_seconds registers once"),

            running: register_gauge_vec!(
                "search_reindex_running",
                "Number of reindex runs in progress",
                &["index_type"]
            )
            .expect("search_reindex_running registers once"),
        }
    }

    pub fn record_run_start(&self, index_type: &str) {
        self.running.with_label_values(&[index_type]).inc();
    }

    pub fn record_run_complete(&self, index_type: &str, success: bool, duration_secs: f64) {
        self.running.with_label_values(&[index_type]).dec();
        let outcome = if success { "success" } else { "failure" };
        self.runs_total
            .with_label_values(&[index_type, outcome])
            .inc();
        self.run_duration
            .with_label_values(&[index_type])
            .observe(duration_secs);
    }

    pub fn record_batch(&self, index_type: &str, documents: usize, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.batch_writes
            .with_label_values(&[index_type, outcome])
            .inc();
        if success {
            self.documents_indexed
                .with_label_values(&[index_type])
                .inc_by(documents as f64);
        }
    }

    pub fn record_retry(&self, index_type: &str) {
        self.batch_retries.with_label_values(&[index_type]).inc();
    }
}

lazy_static! {
    /// Global indexing metrics instance
    pub static ref INDEXING_METRICS: IndexingMetrics = IndexingMetrics::new();
}

/// Force registration so the series exist before the first run
pub fn init_indexing_metrics() {
    lazy_static::initialize(&INDEXING_METRICS);
}

/// Text exposition of every registered metric
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
