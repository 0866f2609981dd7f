use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::coordinator::{SettlementCoordinator, SettlementJob};

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub job: SettlementJob,
    /// Failed passes so far, including the inline retries.
    pub failures: u32,
}

/// Settlement jobs that exhausted their inline retries.
#[derive(Default)]
pub struct ReconciliationQueue {
    jobs: Mutex<VecDeque<QueuedJob>>,
}

impl ReconciliationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: QueuedJob) {
        self.jobs.lock().push_back(job);
    }

    pub fn drain(&self) -> Vec<QueuedJob> {
        self.jobs.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

/// Retry queued settlement jobs every `interval` until `shutdown` fires.
pub fn spawn_reconciler(
    coordinator: Arc<SettlementCoordinator>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "reconciler started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    let (settled, remaining) = coordinator.reconcile_once().await;
                    if settled > 0 || remaining > 0 {
                        info!(settled, remaining, "reconciliation pass");
                    }
                    if remaining > 0 {
                        warn!(remaining, "settlement jobs still pending");
                    }
                }
            }
        }
        info!("reconciler stopped");
    })
}
