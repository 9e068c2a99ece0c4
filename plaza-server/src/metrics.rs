//! Prometheus metrics for request outcomes and read volume.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use std::sync::Arc;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ReadLabels {
    pub endpoint: &'static str,
    pub outcome: &'static str,
}

impl prometheus_client::encoding::EncodeLabelSet for ReadLabels {
    fn encode(
        &self,
        mut encoder: prometheus_client::encoding::LabelSetEncoder,
    ) -> Result<(), std::fmt::Error> {
        use prometheus_client::encoding::EncodeLabel;
        ("endpoint", self.endpoint).encode(encoder.encode_label())?;
        ("outcome", self.outcome).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Outcome label values.
pub const OK: &str = "ok";
pub const INVALID: &str = "invalid";
pub const FAILED: &str = "error";

#[derive(Clone)]
pub struct ServerMetrics {
    pub reads: Family<ReadLabels, Counter>,
    pub rows_returned: Counter,
    pub settings_updated: Counter,
    pub registry: Arc<Registry>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let reads = Family::<ReadLabels, Counter>::default();
        registry.register(
            "plaza_reads",
            "Read requests by endpoint and outcome",
            reads.clone(),
        );

        let rows_returned = Counter::default();
        registry.register(
            "plaza_rows_returned",
            "Rows returned across all reads",
            rows_returned.clone(),
        );

        let settings_updated = Counter::default();
        registry.register(
            "plaza_settings_updated",
            "Client setting rows updated",
            settings_updated.clone(),
        );

        Self {
            reads,
            rows_returned,
            settings_updated,
            registry: Arc::new(registry),
        }
    }

    pub fn record(&self, endpoint: &'static str, outcome: &'static str) {
        self.reads
            .get_or_create(&ReadLabels { endpoint, outcome })
            .inc();
    }

    pub fn record_rows(&self, endpoint: &'static str, rows: usize) {
        self.record(endpoint, OK);
        self.rows_returned.inc_by(rows as u64);
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
