// src/metrics/collector.rs
use dashmap::DashSet;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tracing::debug;

use super::runtime::RuntimeCollector;
use super::sink::{MetricsSink, SinkError};

const NAMESPACE: &str = "healthcheck";

/// Which optional collectors to install next to the per-check metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsOptions {
    pub build_info: bool,
    pub runtime: bool,
    pub process: bool,
}

/// Prometheus-backed metrics sink with its own registry, so several health
/// checks can live in one process without clashing.
pub struct PrometheusSink {
    registry: Registry,
    check_status: IntGaugeVec,
    check_duration_seconds: HistogramVec,
    check_failures_total: IntCounterVec,
    checks: DashSet<String>,
}

impl PrometheusSink {
    pub fn new(options: MetricsOptions) -> Result<Self, SinkError> {
        let registry = Registry::new();

        let check_status = IntGaugeVec::new(
            Opts::new(
                "check_status",
                "Check availability (1=ok, 0=failed)",
            )
            .namespace(NAMESPACE),
            &["check"],
        )?;
        registry.register(Box::new(check_status.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "check_duration_seconds",
                "Check execution duration in seconds",
            )
            .namespace(NAMESPACE),
            &["check"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let check_failures_total = IntCounterVec::new(
            Opts::new("check_failures_total", "Total failed check executions")
                .namespace(NAMESPACE),
            &["check"],
        )?;
        registry.register(Box::new(check_failures_total.clone()))?;

        if options.build_info {
            let build_info = IntGaugeVec::new(
                Opts::new("build_info", "Build information").namespace(NAMESPACE),
                &["version"],
            )?;
            build_info
                .with_label_values(&[env!("CARGO_PKG_VERSION")])
                .set(1);
            registry.register(Box::new(build_info))?;
        }

        if options.runtime {
            registry.register(Box::new(RuntimeCollector::new(NAMESPACE)?))?;
        }

        if options.process {
            #[cfg(target_os = "linux")]
            registry.register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))?;
            #[cfg(not(target_os = "linux"))]
            tracing::warn!("Process metrics are only collected on Linux");
        }

        Ok(Self {
            registry,
            check_status,
            check_duration_seconds,
            check_failures_total,
            checks: DashSet::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl MetricsSink for PrometheusSink {
    fn register(&self, name: &str) -> Result<(), SinkError> {
        // Touch every series so the check shows up before its first run.
        self.check_status.get_metric_with_label_values(&[name])?;
        self.check_duration_seconds
            .get_metric_with_label_values(&[name])?;
        self.check_failures_total
            .get_metric_with_label_values(&[name])?;

        self.checks.insert(name.to_string());
        debug!("Registered metrics for check {}", name);
        Ok(())
    }

    fn observe(
        &self,
        name: &str,
        latency_seconds: f64,
        error: Option<&str>,
    ) -> Result<(), SinkError> {
        if !self.checks.contains(name) {
            return Err(SinkError::UnknownCheck(name.to_string()));
        }

        let value = if error.is_none() { 1 } else { 0 };
        self.check_status.with_label_values(&[name]).set(value);

        self.check_duration_seconds
            .with_label_values(&[name])
            .observe(latency_seconds);

        if error.is_some() {
            self.check_failures_total.with_label_values(&[name]).inc();
        }

        Ok(())
    }

    fn gather(&self) -> Result<Vec<u8>, SinkError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| SinkError::Encoding(e.to_string()))?;
        Ok(buffer)
    }
}
