// src/metrics/runtime.rs
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{IntGauge, Opts};
use tokio::runtime::Handle;

/// Exports Tokio runtime gauges, sampled at scrape time.
pub struct RuntimeCollector {
    workers: IntGauge,
    alive_tasks: IntGauge,
}

impl RuntimeCollector {
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let workers = IntGauge::with_opts(
            Opts::new("runtime_workers", "Number of Tokio worker threads").namespace(namespace),
        )?;
        let alive_tasks = IntGauge::with_opts(
            Opts::new("runtime_alive_tasks", "Number of alive Tokio tasks").namespace(namespace),
        )?;

        Ok(Self {
            workers,
            alive_tasks,
        })
    }
}

impl Collector for RuntimeCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.workers
            .desc()
            .into_iter()
            .chain(self.alive_tasks.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        // Outside a runtime the last sampled values are reported.
        if let Ok(handle) = Handle::try_current() {
            let metrics = handle.metrics();
            self.workers.set(metrics.num_workers() as i64);
            self.alive_tasks.set(metrics.num_alive_tasks() as i64);
        }

        let mut families = self.workers.collect();
        families.extend(self.alive_tasks.collect());
        families
    }
}
