// src/health/probe.rs
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Result type every probe returns. The error's display text becomes the
/// failed check's detail.
pub type ProbeResult = anyhow::Result<()>;

/// A named unit of work that checks one dependency.
///
/// Closures of the shape `Fn(ProbeContext) -> impl Future<Output = ProbeResult>`
/// implement this trait, so most callers never write an impl by hand.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, ctx: ProbeContext) -> ProbeResult;
}

#[async_trait]
impl<F, Fut> Probe for F
where
    F: Fn(ProbeContext) -> Fut + Send + Sync,
    Fut: Future<Output = ProbeResult> + Send + 'static,
{
    async fn check(&self, ctx: ProbeContext) -> ProbeResult {
        (self)(ctx).await
    }
}

/// Deadline shared by every probe of one aggregation run.
///
/// Expiry is advisory: a probe is expected to give up once the deadline has
/// passed, but nothing forces it to.
#[derive(Debug, Clone, Copy)]
pub struct ProbeContext {
    deadline: Instant,
}

#[derive(Debug, thiserror::Error)]
#[error("deadline exceeded after {0:?}")]
pub struct DeadlineExceeded(pub Duration);

impl ProbeContext {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Resolves once the shared deadline has passed.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await
    }

    /// Drive `fut` until it finishes or the deadline passes, whichever is first.
    pub async fn within<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        let budget = self.remaining();
        timeout_at(self.deadline, fut)
            .await
            .map_err(|_| DeadlineExceeded(budget))
    }
}
