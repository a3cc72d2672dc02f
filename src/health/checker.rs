// src/health/checker.rs
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::cache::ResultCache;
use super::engine::{AggregationEngine, DEFAULT_TIMEOUT};
use super::outcome::{AggregateResult, StatusPolicy};
use super::probe::Probe;
use super::refresh::{LoopState, RefreshLoop};
use super::registry::{ProbeRegistry, RegistryError};
use crate::config::CheckConfig;
use crate::metrics::{MetricsOptions, MetricsSink, PrometheusSink, SharedSink, SinkError};

/// A self-contained health check: its own registry, engine, cache and
/// optional background refresh. Instances share no state with each other.
pub struct HealthCheck {
    registry: Arc<ProbeRegistry>,
    engine: Arc<AggregationEngine>,
    cache: Arc<ResultCache>,
    refresh: Option<RefreshLoop>,
    sink: Option<SharedSink>,
}

impl HealthCheck {
    pub fn builder() -> HealthCheckBuilder {
        HealthCheckBuilder::default()
    }

    /// Register a probe. Must happen before [`start`](Self::start) or the
    /// first status query.
    pub fn add(
        &self,
        name: impl Into<String>,
        notes: impl Into<String>,
        probe: impl Probe + 'static,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, notes, probe)
    }

    pub fn add_arc(
        &self,
        name: impl Into<String>,
        notes: impl Into<String>,
        probe: Arc<dyn Probe>,
    ) -> Result<(), RegistryError> {
        self.registry.register_arc(name, notes, probe)
    }

    /// Close registration and, in background mode, launch the refresh loop.
    pub fn start(&self) {
        self.registry.seal();

        if let Some(refresh) = &self.refresh {
            if refresh.start() {
                info!(
                    "Health check started in background mode with {} checks",
                    self.registry.len()
                );
            }
        }
    }

    /// Stop the refresh loop and wait for it. No-op in on-demand mode.
    pub async fn shutdown(&self) {
        if let Some(refresh) = &self.refresh {
            refresh.shutdown().await;
        }
    }

    /// Current status: the cached result in background mode, a fresh run
    /// otherwise.
    pub async fn status(&self) -> Arc<AggregateResult> {
        if self.refresh.is_some() {
            return self.cache.load();
        }

        self.registry.seal();
        Arc::new(self.engine.run().await)
    }

    /// Run every probe now, bypassing the cache.
    pub async fn run_checks(&self) -> AggregateResult {
        self.engine.run().await
    }

    pub fn policy(&self) -> &StatusPolicy {
        self.engine.policy()
    }

    pub fn timeout(&self) -> Duration {
        self.engine.timeout()
    }

    pub fn metrics(&self) -> Option<&SharedSink> {
        self.sink.as_ref()
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn is_background(&self) -> bool {
        self.refresh.is_some()
    }

    pub fn refresh_state(&self) -> LoopState {
        self.refresh
            .as_ref()
            .map(RefreshLoop::state)
            .unwrap_or(LoopState::Stopped)
    }
}

#[derive(Clone)]
pub struct HealthCheckBuilder {
    policy: StatusPolicy,
    timeout: Duration,
    sink: Option<SharedSink>,
    background: Option<Duration>,
}

impl Default for HealthCheckBuilder {
    fn default() -> Self {
        Self {
            policy: StatusPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            sink: None,
            background: None,
        }
    }
}

impl HealthCheckBuilder {
    /// Seed a builder from the `check` section of the configuration.
    pub fn from_config(config: &CheckConfig) -> Result<Self, SinkError> {
        let mut builder = Self::default()
            .with_success_status(config.success_status)
            .with_error_status(config.error_status)
            .with_pending_status(config.pending_status)
            .with_success_label(config.success_label.clone())
            .with_error_label(config.error_label.clone())
            .with_pending_label(config.pending_label.clone())
            .with_timeout(config.timeout());

        if config.metrics.enabled {
            builder = builder.with_metrics(MetricsOptions {
                build_info: config.metrics.build_info,
                runtime: config.metrics.runtime,
                process: config.metrics.process,
            })?;
        }

        if config.background.enabled {
            builder = builder.with_background(config.background.interval());
        }

        Ok(builder)
    }

    /// Codes outside `200..=599` are ignored, here and in the other
    /// `with_*_status` setters.
    pub fn with_success_status(mut self, code: u16) -> Self {
        self.policy.success_code = final_code(code, self.policy.success_code);
        self
    }

    /// Status code returned when any check fails.
    pub fn with_error_status(mut self, code: u16) -> Self {
        self.policy.error_code = final_code(code, self.policy.error_code);
        self
    }

    /// Status code returned before the first background run completes.
    pub fn with_pending_status(mut self, code: u16) -> Self {
        self.policy.pending_code = final_code(code, self.policy.pending_code);
        self
    }

    pub fn with_success_label(mut self, label: impl Into<String>) -> Self {
        self.policy.success_label = label.into();
        self
    }

    pub fn with_error_label(mut self, label: impl Into<String>) -> Self {
        self.policy.error_label = label.into();
        self
    }

    /// Label reported while no background run has completed.
    pub fn with_pending_label(mut self, label: impl Into<String>) -> Self {
        self.policy.pending_label = label.into();
        self
    }

    /// Deadline shared by every check in one run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collect Prometheus metrics with the given optional collectors.
    pub fn with_metrics(self, options: MetricsOptions) -> Result<Self, SinkError> {
        let sink = PrometheusSink::new(options)?;
        Ok(self.with_metrics_sink(Arc::new(sink)))
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run checks in the background every `interval` and serve cached results.
    pub fn with_background(mut self, interval: Duration) -> Self {
        self.background = Some(interval);
        self
    }

    pub fn build(self) -> HealthCheck {
        let registry = Arc::new(ProbeRegistry::new(self.sink.clone()));
        let cache = Arc::new(ResultCache::new(&self.policy));
        let engine = Arc::new(AggregationEngine::new(
            registry.clone(),
            self.sink.clone(),
            self.policy,
            self.timeout,
        ));

        let refresh = self
            .background
            .map(|interval| RefreshLoop::new(engine.clone(), cache.clone(), interval));

        HealthCheck {
            registry,
            engine,
            cache,
            refresh,
            sink: self.sink,
        }
    }
}

// hyper turns an informational final response into a 500.
fn final_code(code: u16, current: u16) -> u16 {
    if (200..=599).contains(&code) {
        code
    } else {
        warn!("Ignoring HTTP status {}, keeping {}", code, current);
        current
    }
}
