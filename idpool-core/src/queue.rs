//! Single-flight task queue.
//!
//! [`TaskQueue`] runs submitted units of work one at a time, in submission
//! order. Admission is a fair (FIFO) async mutex; once admitted, the work runs
//! on its own task while holding the queue, so a caller that stops waiting does
//! not abort an operation that is halfway through writing the cache.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

/// Error type for queued work that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskQueueError {
    /// The work panicked.
    #[error("queued task panicked")]
    Panicked,

    /// The runtime cancelled the work, e.g. during shutdown.
    #[error("queued task was cancelled")]
    Cancelled,
}

/// FIFO executor that admits one unit of work at a time.
///
/// The queue is content-agnostic: each call to [`sync`](Self::sync) produces
/// the result type of its own work.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() -> Result<(), idpool_core::queue::TaskQueueError> {
/// use idpool_core::queue::TaskQueue;
///
/// let queue = TaskQueue::new();
/// let answer = queue.sync(async { 40 + 2 }).await?;
/// assert_eq!(answer, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct TaskQueue {
    gate: Arc<Mutex<()>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` once every previously submitted unit has completed.
    ///
    /// If the caller is dropped while waiting for admission, the work never
    /// runs. If it is dropped after admission, the work still runs to
    /// completion and its result is discarded.
    pub async fn sync<F, T>(&self, work: F) -> Result<T, TaskQueueError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.gate.clone().lock_owned().await;
        let handle = tokio::spawn(async move {
            let _permit = permit;
            work.await
        });

        handle.await.map_err(|e| {
            if e.is_panic() {
                tracing::error!("Queued task panicked");
                TaskQueueError::Panicked
            } else {
                TaskQueueError::Cancelled
            }
        })
    }

    /// Whether a unit of work currently holds the queue.
    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_typed_results() {
        let queue = TaskQueue::new();
        assert_eq!(queue.sync(async { 42 }).await, Ok(42));
        assert_eq!(queue.sync(async { "done" }).await, Ok("done"));
        assert!(!queue.is_running());
    }

    #[tokio::test]
    async fn test_runs_in_submission_order() {
        let queue = TaskQueue::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .sync(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        order.lock().push(i);
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_overlaps() {
        let queue = TaskQueue::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let queue = queue.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .sync(async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_active.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_admitted_work_survives_caller_cancellation() {
        let queue = TaskQueue::new();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        let caller = queue.sync(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(5), caller).await;
        assert!(timed_out.is_err());

        // The next unit is admitted only after the abandoned one finished.
        let observed = {
            let flag = finished.clone();
            queue.sync(async move { flag.load(Ordering::SeqCst) }).await
        };
        assert_eq!(observed, Ok(true));
    }

    #[tokio::test]
    async fn test_panicking_work_releases_queue() {
        let queue = TaskQueue::new();

        let result: Result<(), _> = queue.sync(async { panic!("boom") }).await;
        assert_eq!(result, Err(TaskQueueError::Panicked));

        assert_eq!(queue.sync(async { 1 }).await, Ok(1));
    }
}
