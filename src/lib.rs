// src/lib.rs
pub mod config;
pub mod health;
pub mod metrics;
pub mod probes;
pub mod server;

pub use health::{
    AggregateResult, HealthCheck, HealthCheckBuilder, OverallStatus, Probe, ProbeContext,
    ProbeOutcome, ProbeResult, ProbeStatus, RegistryError,
};
pub use metrics::{MetricsOptions, MetricsSink, PrometheusSink, SinkError};
