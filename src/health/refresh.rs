// src/health/refresh.rs
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::cache::ResultCache;
use super::engine::AggregationEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    Stopping,
}

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Inner {
    state: LoopState,
    worker: Option<Worker>,
}

/// Background task that keeps the result cache fresh.
pub struct RefreshLoop {
    engine: Arc<AggregationEngine>,
    cache: Arc<ResultCache>,
    interval: Duration,
    inner: Mutex<Inner>,
}

impl RefreshLoop {
    pub fn new(engine: Arc<AggregationEngine>, cache: Arc<ResultCache>, interval: Duration) -> Self {
        Self {
            engine,
            cache,
            interval,
            inner: Mutex::new(Inner {
                state: LoopState::Stopped,
                worker: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoopState {
        self.lock().state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the worker onto the current Tokio runtime. Returns `false` if a
    /// worker is already running or stopping.
    pub fn start(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != LoopState::Stopped {
            debug!("Refresh loop already {:?}, ignoring start", inner.state);
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(
            self.engine.clone(),
            self.cache.clone(),
            self.interval,
            stop_rx,
        ));

        inner.worker = Some(Worker { stop_tx, handle });
        inner.state = LoopState::Running;
        true
    }

    /// Signal the worker to stop and wait for it to exit. Once this returns
    /// the cache is no longer written to. No-op if the loop never started.
    pub async fn shutdown(&self) {
        let worker = {
            let mut inner = self.lock();
            match inner.worker.take() {
                Some(worker) => {
                    inner.state = LoopState::Stopping;
                    worker
                }
                None => return,
            }
        };

        let _ = worker.stop_tx.send(true);
        if let Err(e) = worker.handle.await {
            warn!("Refresh worker exited abnormally: {}", e);
        }

        self.lock().state = LoopState::Stopped;
        info!("Refresh loop stopped");
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(worker) = inner.worker.take() {
            // The worker exits on its own once the current run finishes.
            let _ = worker.stop_tx.send(true);
        }
    }
}

async fn run_worker(
    engine: Arc<AggregationEngine>,
    cache: Arc<ResultCache>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!(
        "Starting background health checks with interval: {:?}",
        interval
    );

    loop {
        let result = engine.run().await;
        cache.store(result);

        tokio::select! {
            _ = sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        if *stop_rx.borrow() {
            break;
        }
    }

    info!("Background health checks shutting down");
}
