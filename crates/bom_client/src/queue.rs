//! Single-lane request queue.
//!
//! Every outbound call is submitted here and executed one at a time, in
//! submission order, whoever submitted it. The BOM API is rate-sensitive and
//! a location search must never race a forecast fetch.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound on how long one task may hold the execution slot.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_millis(5000);

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct Shared {
    pending: Mutex<VecDeque<Job>>,
    notify: Notify,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO execution lane with concurrency fixed at 1.
///
/// Must be created inside a Tokio runtime; the worker task is aborted when
/// the queue is dropped.
pub struct RequestQueue {
    shared: Arc<Shared>,
    worker: JoinHandle<()>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TASK_TIMEOUT)
    }

    pub fn with_timeout(task_timeout: Duration) -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), task_timeout));
        Self { shared, worker }
    }

    /// Submit a task and wait for its output.
    ///
    /// Returns `None` if the task timed out, panicked, or was discarded by
    /// [`clear`](Self::clear) before it started.
    pub async fn enqueue<F, Fut, T>(&self, task: F) -> Option<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let output = task().await;
                // The caller may have stopped waiting.
                let _ = tx.send(output);
            })
        });

        self.shared.pending().push_back(job);
        self.shared.notify.notify_one();

        rx.await.ok()
    }

    /// Drop every task that has not started yet. The running task is left alone.
    pub fn clear(&self) -> usize {
        let mut pending = self.shared.pending();
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            debug!("Request queue cleared, {} pending task(s) discarded", dropped);
        }
        dropped
    }

    /// Number of tasks waiting for the execution slot.
    pub fn pending_len(&self) -> usize {
        self.shared.pending().len()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker(shared: Arc<Shared>, task_timeout: Duration) {
    loop {
        let next = shared.pending().pop_front();
        let Some(job) = next else {
            shared.notify.notified().await;
            continue;
        };

        let mut handle = tokio::spawn(job());
        match timeout(task_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Queued request task failed: {}", e),
            Err(_) => {
                warn!(
                    "Queued request exceeded {}ms, releasing slot",
                    task_timeout.as_millis()
                );
                handle.abort();
            }
        }
    }
}
