// src/metrics/mod.rs
mod collector;
mod runtime;
mod sink;

pub use collector::{MetricsOptions, PrometheusSink};
pub use runtime::RuntimeCollector;
pub use sink::{MetricsSink, SharedSink, SinkError};
