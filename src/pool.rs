//! Bounded-concurrency task executor
//!
//! A thin semaphore gate in front of `tokio::spawn`: `submit` waits for a
//! free slot (non-busy, in submission order as far as the semaphore goes),
//! then schedules the task. The permit travels with the task and is
//! released when it finishes, panicking or not, so a misbehaving task can
//! never leak a slot or take the pool down.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// Completion handle for a submitted task
///
/// Dropping it detaches the task; `join` waits and surfaces the task's
/// value, or an error when the task panicked.
pub struct TaskHandle<T> {
    inner: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    pub async fn join(self) -> anyhow::Result<T> {
        self.inner
            .await
            .map_err(|error| anyhow::anyhow!("worker task failed: {error}"))
    }
}

/// Bounded executor for parallel batch processing
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    parallelism: usize,
}

impl WorkerPool {
    /// Pool with an explicit parallelism bound (minimum 1).
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        debug!(parallelism, "worker pool created");

        Self {
            permits: Arc::new(Semaphore::new(parallelism)),
            parallelism,
        }
    }

    /// Pool sized to the host's logical processor count.
    pub fn with_default_parallelism() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        Self::new(parallelism)
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Schedule a task, suspending the caller until a worker slot is free.
    pub async fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("worker pool semaphore closed");

        let inner = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });

        TaskHandle { inner }
    }

    /// Fire-and-forget variant of `submit`.
    pub async fn submit_void<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let _detached = self.submit(task).await;
    }

    /// Submit one task per item and wait for all of them.
    ///
    /// Returns after the slowest task completes; each item's result (or
    /// task failure) comes back in item order.
    pub async fn process_batch<I, F, Fut, T>(&self, items: I, per_item: F) -> Vec<anyhow::Result<T>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::new();
        for item in items {
            handles.push(self.submit(per_item(item)).await);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.join().await);
        }

        results
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_default_parallelism()
    }
}
