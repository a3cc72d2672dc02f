// src/health/engine.rs
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::outcome::{AggregateResult, ProbeOutcome, ProbeStatus, StatusPolicy};
use super::probe::{Probe, ProbeContext};
use super::registry::ProbeRegistry;
use crate::metrics::SharedSink;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs every registered probe under one shared deadline and folds the
/// outcomes into an [`AggregateResult`].
pub struct AggregationEngine {
    registry: Arc<ProbeRegistry>,
    sink: Option<SharedSink>,
    policy: StatusPolicy,
    timeout: Duration,
}

struct Execution {
    latency: Duration,
    observed_at: DateTime<Utc>,
    result: Result<(), String>,
}

impl AggregationEngine {
    pub fn new(
        registry: Arc<ProbeRegistry>,
        sink: Option<SharedSink>,
        policy: StatusPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute every probe once. Never fails: broken, slow or panicking
    /// probes only turn into failed outcomes.
    ///
    /// Probes run concurrently and all observe the same deadline. The
    /// deadline is advisory, so a probe that ignores its context keeps the
    /// run waiting until it returns. Dropping the returned future aborts any
    /// check still in flight.
    pub async fn run(&self) -> AggregateResult {
        let started = Instant::now();
        let ctx = ProbeContext::with_timeout(self.timeout);
        let probes = self.registry.snapshot();

        let mut tasks = Vec::with_capacity(probes.len());
        let mut guard = AbortOnDrop(Vec::with_capacity(probes.len()));
        for entry in &probes {
            let task = tokio::spawn(execute(entry.probe.clone(), ctx));
            guard.0.push(task.abort_handle());
            tasks.push(task);
        }

        // Wait for all checks to complete
        let results = futures::future::join_all(tasks).await;
        drop(guard);

        let mut outcomes = Vec::with_capacity(probes.len());
        for (entry, result) in probes.iter().zip(results) {
            let execution = match result {
                Ok(execution) => execution,
                Err(e) => Execution {
                    latency: started.elapsed(),
                    observed_at: Utc::now(),
                    result: Err(format!("check task failed: {}", e)),
                },
            };

            let outcome = ProbeOutcome {
                status: if execution.result.is_ok() {
                    ProbeStatus::Success
                } else {
                    ProbeStatus::Failure
                },
                detail: execution.result.err().unwrap_or_default(),
                latency_seconds: execution.latency.as_secs_f64(),
                observed_at: execution.observed_at,
                notes: entry.notes.clone(),
            };

            if outcome.is_success() {
                debug!(
                    "Check {} passed in {:?}",
                    entry.name, execution.latency
                );
            } else {
                warn!(
                    "Check {} failed in {:?}: {}",
                    entry.name, execution.latency, outcome.detail
                );
            }

            self.report(&entry.name, &outcome);
            outcomes.push((entry.name.clone(), outcome));
        }

        let result = AggregateResult::from_outcomes(outcomes, &self.policy);
        let elapsed = started.elapsed();

        if elapsed > self.timeout {
            warn!(
                "Health check run took {:?}, exceeding its {:?} deadline",
                elapsed, self.timeout
            );
        }

        info!(
            "Health check run complete: {} checks, {} failed, {:?}",
            result.checks.len(),
            result.failed_checks().count(),
            elapsed
        );

        result
    }

    fn report(&self, name: &str, outcome: &ProbeOutcome) {
        let Some(sink) = &self.sink else {
            return;
        };

        let error = (!outcome.is_success()).then_some(outcome.detail.as_str());
        let observed = std::panic::catch_unwind(AssertUnwindSafe(|| {
            sink.observe(name, outcome.latency_seconds, error)
        }));

        match observed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to record metrics for check {}: {}", name, e),
            Err(_) => warn!("Metrics sink panicked while recording check {}", name),
        }
    }
}

/// Aborts the spawned checks if the run is dropped before they finish.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

async fn execute(probe: Arc<dyn Probe>, ctx: ProbeContext) -> Execution {
    let start = Instant::now();
    let result = AssertUnwindSafe(probe.check(ctx)).catch_unwind().await;
    let latency = start.elapsed();

    let result = match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(panic) => Err(format!("check panicked: {}", panic_message(&*panic))),
    };

    Execution {
        latency,
        observed_at: Utc::now(),
        result,
    }
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::outcome::OverallStatus;
    use crate::metrics::{MetricsSink, SinkError};
    use std::sync::Mutex;

    fn engine(registry: Arc<ProbeRegistry>, timeout: Duration) -> AggregationEngine {
        AggregationEngine::new(registry, None, StatusPolicy::default(), timeout)
    }

    #[tokio::test]
    async fn all_passing_checks_give_success() {
        let registry = Arc::new(ProbeRegistry::new(None));
        for name in ["a", "b", "c"] {
            registry
                .register(name, "note", |_ctx: ProbeContext| async {
                    Ok::<_, anyhow::Error>(())
                })
                .unwrap();
        }

        let result = engine(registry, DEFAULT_TIMEOUT).run().await;

        assert_eq!(result.status, OverallStatus::Success);
        assert_eq!(result.http_status, 200);
        assert_eq!(result.checks.len(), 3);
        assert!(result.checks.values().all(|o| o.detail.is_empty()));
        assert_eq!(result.checks["a"].notes, "note");
    }

    #[tokio::test]
    async fn error_context_chain_becomes_detail() {
        let registry = Arc::new(ProbeRegistry::new(None));
        registry
            .register("db", "", |_ctx: ProbeContext| async {
                Err::<(), _>(anyhow::anyhow!("connection refused").context("connect to db"))
            })
            .unwrap();

        let result = engine(registry, DEFAULT_TIMEOUT).run().await;

        assert_eq!(result.status, OverallStatus::Failure);
        assert_eq!(result.http_status, 503);
        assert_eq!(result.checks["db"].detail, "connect to db: connection refused");
    }

    #[tokio::test]
    async fn panicking_check_is_isolated() {
        let registry = Arc::new(ProbeRegistry::new(None));
        registry
            .register("boom", "", |_ctx: ProbeContext| async {
                if true {
                    panic!("probe exploded");
                }
                Ok::<_, anyhow::Error>(())
            })
            .unwrap();
        registry
            .register("fine", "", |_ctx: ProbeContext| async {
                Ok::<_, anyhow::Error>(())
            })
            .unwrap();

        let result = engine(registry, DEFAULT_TIMEOUT).run().await;

        assert_eq!(result.status, OverallStatus::Failure);
        assert_eq!(result.checks["boom"].status, ProbeStatus::Failure);
        assert_eq!(result.checks["boom"].detail, "check panicked: probe exploded");
        assert!(result.checks["fine"].is_success());
    }

    #[tokio::test]
    async fn cooperating_checks_stop_at_the_deadline() {
        let registry = Arc::new(ProbeRegistry::new(None));
        registry
            .register("slow", "", |ctx: ProbeContext| async move {
                ctx.within(tokio::time::sleep(Duration::from_secs(10))).await?;
                Ok::<_, anyhow::Error>(())
            })
            .unwrap();

        let started = Instant::now();
        let result = engine(registry, Duration::from_millis(100)).run().await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.status, OverallStatus::Failure);
        assert!(result.checks["slow"].detail.starts_with("deadline exceeded"));
    }

    #[tokio::test]
    async fn checks_run_concurrently() {
        let registry = Arc::new(ProbeRegistry::new(None));
        for name in ["one", "two", "three", "four"] {
            registry
                .register(name, "", |_ctx: ProbeContext| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, anyhow::Error>(())
                })
                .unwrap();
        }

        let started = Instant::now();
        let result = engine(registry, DEFAULT_TIMEOUT).run().await;

        assert!(result.is_success());
        assert!(started.elapsed() < Duration::from_millis(700));
        assert!(result.checks.values().all(|o| o.latency_seconds >= 0.2));
    }

    #[tokio::test]
    async fn dropping_a_run_cancels_its_checks() {
        let finished = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = finished.clone();
        let registry = Arc::new(ProbeRegistry::new(None));
        registry
            .register("slow", "", move |_ctx: ProbeContext| {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(())
                }
            })
            .unwrap();

        let engine = engine(registry, DEFAULT_TIMEOUT);
        let run = tokio::time::timeout(Duration::from_millis(50), engine.run()).await;
        assert!(run.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[derive(Default)]
    struct FlakySink {
        observed: Mutex<Vec<(String, Option<String>)>>,
    }

    impl MetricsSink for FlakySink {
        fn register(&self, _: &str) -> Result<(), SinkError> {
            Ok(())
        }

        fn observe(&self, name: &str, _: f64, error: Option<&str>) -> Result<(), SinkError> {
            self.observed
                .lock()
                .unwrap()
                .push((name.to_string(), error.map(str::to_string)));
            Err(SinkError::UnknownCheck(name.to_string()))
        }

        fn gather(&self) -> Result<Vec<u8>, SinkError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failing_sink_does_not_change_the_result() {
        let sink = Arc::new(FlakySink::default());
        let registry = Arc::new(ProbeRegistry::new(Some(sink.clone())));
        registry
            .register("ok", "", |_ctx: ProbeContext| async {
                Ok::<_, anyhow::Error>(())
            })
            .unwrap();
        registry
            .register("bad", "", |_ctx: ProbeContext| async {
                Err::<(), _>(anyhow::anyhow!("refused"))
            })
            .unwrap();

        let engine = AggregationEngine::new(
            registry,
            Some(sink.clone()),
            StatusPolicy::default(),
            DEFAULT_TIMEOUT,
        );
        let result = engine.run().await;

        assert_eq!(result.status, OverallStatus::Failure);
        assert_eq!(result.checks.len(), 2);

        let mut observed = sink.observed.lock().unwrap().clone();
        observed.sort();
        assert_eq!(
            observed,
            vec![
                ("bad".to_string(), Some("refused".to_string())),
                ("ok".to_string(), None),
            ]
        );
    }
}
