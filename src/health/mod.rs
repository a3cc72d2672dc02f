// src/health/mod.rs
mod cache;
mod checker;
mod engine;
mod outcome;
mod probe;
mod refresh;
mod registry;
mod report;

pub use cache::ResultCache;
pub use checker::{HealthCheck, HealthCheckBuilder};
pub use engine::{AggregationEngine, DEFAULT_TIMEOUT};
pub use outcome::{AggregateResult, OverallStatus, ProbeOutcome, ProbeStatus, StatusPolicy};
pub use probe::{DeadlineExceeded, Probe, ProbeContext, ProbeResult};
pub use refresh::{LoopState, RefreshLoop};
pub use registry::{ProbeRegistry, RegisteredProbe, RegistryError};
pub use report::{CheckReport, ErrorReport, HealthReport};
