// tests/healthcheck_tests.rs
use proptest::prelude::*;
use rust_healthcheck::health::{HealthReport, LoopState};
use rust_healthcheck::{HealthCheck, OverallStatus, ProbeContext, ProbeStatus};
use std::time::{Duration, Instant};

fn sleeping_probe(
    delay: Duration,
    error: Option<&'static str>,
) -> impl Fn(ProbeContext) -> futures::future::BoxFuture<'static, anyhow::Result<()>> {
    move |_ctx| {
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            match error {
                Some(msg) => Err(anyhow::anyhow!(msg)),
                None => Ok(()),
            }
        })
    }
}

#[tokio::test]
async fn db_ok_redis_timeout_scenario() {
    let hc = HealthCheck::builder()
        .with_timeout(Duration::from_secs(1))
        .build();
    hc.add("db", "db.company:1521", sleeping_probe(Duration::from_millis(10), None))
        .unwrap();
    hc.add(
        "redis",
        "redis.company:9056",
        sleeping_probe(Duration::from_millis(5), Some("timeout")),
    )
    .unwrap();

    let result = hc.status().await;

    assert_eq!(result.status, OverallStatus::Failure);
    assert_eq!(result.http_status, 503);
    assert_eq!(result.checks["db"].status, ProbeStatus::Success);
    assert_eq!(result.checks["redis"].status, ProbeStatus::Failure);
    assert_eq!(result.checks["redis"].detail, "timeout");

    let report = serde_json::to_value(HealthReport::new(&result, hc.policy())).unwrap();
    assert_eq!(report["status"], "error");
    assert_eq!(report["checks"]["db"]["status"], "ok");
    assert_eq!(report["checks"]["redis"]["status"], "timeout");
}

#[tokio::test]
async fn no_checks_means_ok() {
    let hc = HealthCheck::builder().build();

    let result = hc.status().await;

    assert_eq!(result.status, OverallStatus::Success);
    assert_eq!(result.http_status, 200);
    assert!(result.checks.is_empty());
}

#[tokio::test]
async fn duplicate_registration_keeps_first_probe() {
    let hc = HealthCheck::builder().build();
    hc.add("db", "first", sleeping_probe(Duration::ZERO, None))
        .unwrap();

    let err = hc
        .add("db", "second", sleeping_probe(Duration::ZERO, Some("boom")))
        .unwrap_err();
    assert_eq!(err.to_string(), "check with name db already exists");

    let result = hc.status().await;
    assert_eq!(result.status, OverallStatus::Success);
    assert_eq!(result.checks["db"].notes, "first");
}

#[tokio::test]
async fn run_overruns_deadline_only_by_stubborn_probe() {
    let hc = HealthCheck::builder()
        .with_timeout(Duration::from_millis(100))
        .build();
    hc.add("polite", "", |ctx: ProbeContext| async move {
        ctx.expired().await;
        Err::<(), _>(anyhow::anyhow!("gave up at deadline"))
    })
    .unwrap();
    hc.add("stubborn", "", sleeping_probe(Duration::from_millis(400), None))
        .unwrap();

    let started = Instant::now();
    let result = hc.status().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(400));
    assert!(elapsed < Duration::from_millis(1200));
    assert_eq!(result.checks["polite"].detail, "gave up at deadline");
    assert!(result.checks["polite"].latency_seconds < 0.4);
    assert!(result.checks["stubborn"].latency_seconds >= 0.4);
}

#[tokio::test]
async fn concurrent_instances_are_independent() {
    let first = HealthCheck::builder().build();
    first
        .add("db", "", sleeping_probe(Duration::from_millis(50), None))
        .unwrap();

    let second = HealthCheck::builder().build();
    second
        .add("queue", "", sleeping_probe(Duration::from_millis(10), Some("no broker")))
        .unwrap();
    second
        .add("cache", "", sleeping_probe(Duration::from_millis(30), None))
        .unwrap();

    let (a, b) = tokio::join!(first.status(), second.status());

    assert_eq!(a.status, OverallStatus::Success);
    assert_eq!(a.checks.keys().collect::<Vec<_>>(), vec!["db"]);
    assert_eq!(b.status, OverallStatus::Failure);
    assert_eq!(b.checks.keys().collect::<Vec<_>>(), vec!["cache", "queue"]);
}

#[tokio::test]
async fn background_cache_is_stable_after_shutdown() {
    let hc = HealthCheck::builder()
        .with_background(Duration::from_millis(20))
        .build();
    hc.add("db", "", sleeping_probe(Duration::from_millis(100), None))
        .unwrap();

    hc.start();
    let before_first_cycle = hc.status().await;
    assert_eq!(before_first_cycle.status, OverallStatus::Pending);
    assert_eq!(before_first_cycle.http_status, 202);

    tokio::time::sleep(Duration::from_millis(400)).await;
    hc.shutdown().await;
    assert_eq!(hc.refresh_state(), LoopState::Stopped);

    let at_shutdown = hc.status().await;
    assert_eq!(at_shutdown.status, OverallStatus::Success);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let later = hc.status().await;
    assert_eq!(later.checks["db"].observed_at, at_shutdown.checks["db"].observed_at);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn aggregate_fails_iff_any_probe_fails(outcomes in proptest::collection::vec(any::<bool>(), 0..8)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(async {
            let hc = HealthCheck::builder().build();
            for (i, passes) in outcomes.iter().enumerate() {
                let error = if *passes { None } else { Some("failed") };
                hc.add(format!("check-{}", i), "", sleeping_probe(Duration::ZERO, error))
                    .unwrap();
            }
            hc.status().await
        });

        let any_failed = outcomes.iter().any(|passes| !passes);
        prop_assert_eq!(result.checks.len(), outcomes.len());
        prop_assert_eq!(result.status == OverallStatus::Failure, any_failed);
        prop_assert_eq!(result.http_status, if any_failed { 503 } else { 200 });

        for (i, passes) in outcomes.iter().enumerate() {
            let outcome = &result.checks[&format!("check-{}", i)];
            prop_assert_eq!(outcome.is_success(), *passes);
            if !passes {
                prop_assert_eq!(outcome.detail.as_str(), "failed");
            }
        }
    }
}
