//! Bounded render pool and per-task cancellation.
//!
//! Submitted units of work are spawned immediately but wait for one of
//! `size` permits before rendering. Tokio's semaphore is fair, so waiting
//! units form a FIFO admission queue. A unit whose task is cancelled while
//! still queued is withdrawn without ever taking a permit.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lapse_media::cancelled;
use lapse_models::TaskId;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of waiting in the admission queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A render slot is held for the duration of the unit.
    Granted,
    /// The task was cancelled before a slot became free.
    Withdrawn,
}

/// Fixed-size pool of render slots.
pub struct RenderPool {
    permits: Arc<Semaphore>,
    size: usize,
    workers: tokio::sync::Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl RenderPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            workers: tokio::sync::Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held by a render.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Spawn a unit of work. Never waits for a slot.
    ///
    /// Returns `false` without running `work` once the pool is draining.
    pub async fn submit<F, Fut>(&self, cancel: watch::Receiver<bool>, work: F) -> bool
    where
        F: FnOnce(Admission) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let mut workers = self.workers.lock().await;
        if self.is_closed() {
            return false;
        }

        // Reap finished units so the set only tracks live work
        while workers.try_join_next().is_some() {}

        workers.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancelled(Some(cancel)) => None,
                permit = permits.acquire_owned() => permit.ok(),
            };

            let admission = if permit.is_some() {
                Admission::Granted
            } else {
                Admission::Withdrawn
            };
            work(admission).await;
            drop(permit);
        });
        true
    }

    /// Close the pool and wait for every submitted unit to finish.
    /// Returns `false` if the timeout expired first; remaining units are
    /// aborted.
    pub async fn drain(&self, timeout: Duration) -> bool {
        // Swap the set out so submit never queues behind a long drain
        let mut workers = {
            let mut guard = self.workers.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *guard)
        };
        info!("Waiting for {} render units to settle", workers.len());

        let settled = tokio::time::timeout(timeout, async {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    warn!("Render unit ended abnormally: {}", e);
                }
            }
        })
        .await
        .is_ok();

        if !settled {
            warn!(
                "Render pool drain timed out after {:?}, aborting {} units",
                timeout,
                workers.len()
            );
            workers.abort_all();
        }
        settled
    }
}

/// Cancellation senders of tasks that have not settled yet.
#[derive(Debug, Clone, Default)]
pub struct CancelTokens {
    senders: Arc<Mutex<HashMap<TaskId, watch::Sender<bool>>>>,
}

impl CancelTokens {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, watch::Sender<bool>>> {
        self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create the token of a new task.
    pub fn issue(&self, task_id: &TaskId) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.lock().insert(task_id.clone(), tx);
        rx
    }

    /// Raise the cancel flag. `false` if the task holds no token.
    pub fn signal(&self, task_id: &TaskId) -> bool {
        match self.lock().get(task_id) {
            Some(tx) => {
                tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Raise every outstanding flag and return how many were raised.
    pub fn signal_all(&self) -> usize {
        let senders = self.lock();
        for tx in senders.values() {
            tx.send_replace(true);
        }
        senders.len()
    }

    /// Drop the token of a settled task.
    pub fn release(&self, task_id: &TaskId) {
        if self.lock().remove(task_id).is_some() {
            debug!(task_id = %task_id, "Released cancel token");
        }
    }

    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }
}
