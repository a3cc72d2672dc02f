// src/metrics/sink.rs
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("metrics backend error: {0}")]
    Backend(#[from] prometheus::Error),

    #[error("check {0} was never registered with the metrics sink")]
    UnknownCheck(String),

    #[error("metrics encoding failed: {0}")]
    Encoding(String),
}

/// Observer of probe outcomes.
///
/// Implementations synchronize their own state; the engine calls them from
/// whichever task finished the probe.
pub trait MetricsSink: Send + Sync {
    /// Called once per probe when it is registered.
    fn register(&self, name: &str) -> Result<(), SinkError>;

    /// Called once per probe per run. `error` carries the failure text.
    fn observe(&self, name: &str, latency_seconds: f64, error: Option<&str>)
        -> Result<(), SinkError>;

    /// Exposition payload served on the metrics endpoint.
    fn gather(&self) -> Result<Vec<u8>, SinkError>;

    fn content_type(&self) -> &str {
        "text/plain; version=0.0.4"
    }
}

pub type SharedSink = Arc<dyn MetricsSink>;
