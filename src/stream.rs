//! Bounded producer/consumer streaming queue
//!
//! A single consumer task drains the channel in FIFO order and hands each
//! raw line to the processing closure. Producers block inside `produce`
//! while the channel is full - that is the backpressure mechanism, there is
//! no other. `stop` closes the channel and gives the consumer five seconds
//! to drain; after `stop`, `produce` fails with `QueueClosed`.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{PipelineError, PipelineResult};

pub const DEFAULT_CAPACITY: usize = 100;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded channel with exactly one consumer task
pub struct StreamQueue {
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<String>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    raw_events: broadcast::Sender<String>,
}

impl StreamQueue {
    pub fn new(capacity: usize) -> Self {
        let (raw_events, _) = broadcast::channel(capacity.max(1));

        Self {
            capacity: capacity.max(1),
            sender: Mutex::new(None),
            consumer: Mutex::new(None),
            raw_events,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe to the raw-data event fired inside `produce`.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<String> {
        self.raw_events.subscribe()
    }

    /// Spawn the single consumer task.
    ///
    /// `process` is called for each line in FIFO order; its failures are
    /// logged and swallowed so one bad line never stops the stream. Calling
    /// `start` again without an intervening `stop` fails.
    pub fn start<F, Fut>(&self, process: F) -> PipelineResult<()>
    where
        F: Fn(String) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);

        if consumer.is_some() {
            return Err(PipelineError::QueueAlreadyRunning);
        }

        let (tx, mut rx) = mpsc::channel(self.capacity);
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);

        let join = tokio::spawn(async move {
            debug!("stream consumer started");

            while let Some(raw) = rx.recv().await {
                if let Err(error) = process(raw.clone()).await {
                    warn!(%error, line = %raw, "stream consumer failed on line");
                }
            }

            debug!("stream consumer drained");
        });

        *consumer = Some(join);
        Ok(())
    }

    /// Enqueue a raw line, blocking while the channel is full.
    ///
    /// The raw-data event fires synchronously before the enqueue.
    pub async fn produce(&self, raw: impl Into<String>) -> PipelineResult<()> {
        let raw = raw.into();

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(sender) = sender else {
            return Err(PipelineError::QueueClosed);
        };

        let _ = self.raw_events.send(raw.clone());

        sender
            .send(raw)
            .await
            .map_err(|_| PipelineError::QueueClosed)
    }

    /// Close the channel and wait up to five seconds for the consumer.
    ///
    /// Returns even when the consumer has not finished; the queue is closed
    /// either way and further `produce` calls fail.
    pub async fn stop(&self) {
        let closed = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if closed.is_none() {
            debug!("stream queue already closed");
        }

        let consumer = self
            .consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(join) = consumer {
            match timeout(STOP_TIMEOUT, join).await {
                Ok(Ok(())) => debug!("stream consumer stopped cleanly"),
                Ok(Err(error)) => warn!(%error, "stream consumer task failed"),
                Err(_) => warn!("stream consumer did not drain within 5s, detaching"),
            }
        }
    }
}

impl Default for StreamQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn consumer_sees_lines_in_fifo_order() {
        let queue = StreamQueue::new(10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_consumer = Arc::clone(&seen);

        queue
            .start(move |line| {
                let seen = Arc::clone(&seen_in_consumer);
                async move {
                    seen.lock().unwrap().push(line);
                    Ok(())
                }
            })
            .unwrap();

        for i in 0..5 {
            queue.produce(format!("line-{i}")).await.unwrap();
        }

        queue.stop().await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec!["line-0", "line-1", "line-2", "line-3", "line-4"]
        );
    }

    #[tokio::test]
    async fn produce_after_stop_fails_closed() {
        let queue = StreamQueue::new(4);
        queue.start(|_| async { Ok(()) }).unwrap();
        queue.stop().await;

        let result = queue.produce("late").await;
        assert!(matches!(result, Err(PipelineError::QueueClosed)));
    }

    #[tokio::test]
    async fn start_twice_without_stop_fails() {
        let queue = StreamQueue::new(4);
        queue.start(|_| async { Ok(()) }).unwrap();

        let second = queue.start(|_| async { Ok(()) });
        assert!(matches!(second, Err(PipelineError::QueueAlreadyRunning)));

        queue.stop().await;

        // after a stop the queue can be started again
        queue.start(|_| async { Ok(()) }).unwrap();
        queue.stop().await;
    }

    #[tokio::test]
    async fn consumer_failures_are_swallowed() {
        let queue = StreamQueue::new(4);
        let processed = Arc::new(AtomicUsize::new(0));
        let processed_in_consumer = Arc::clone(&processed);

        queue
            .start(move |line| {
                let processed = Arc::clone(&processed_in_consumer);
                async move {
                    if line == "bad" {
                        anyhow::bail!("unprocessable");
                    }
                    processed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        queue.produce("good").await.unwrap();
        queue.produce("bad").await.unwrap();
        queue.produce("good").await.unwrap();
        queue.stop().await;

        assert_eq!(processed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn raw_event_fires_inside_produce() {
        let queue = StreamQueue::new(4);
        let mut raw_rx = queue.subscribe_raw();

        queue.start(|_| async { Ok(()) }).unwrap();
        queue.produce("hello").await.unwrap();

        assert_eq!(raw_rx.recv().await.unwrap(), "hello");
        queue.stop().await;
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure_until_drained() {
        let queue = Arc::new(StreamQueue::new(2));
        let produced = Arc::new(AtomicUsize::new(0));
        let consumed = Arc::new(AtomicUsize::new(0));

        // consumer is deliberately slow
        let consumed_in_consumer = Arc::clone(&consumed);
        queue
            .start(move |_| {
                let consumed = Arc::clone(&consumed_in_consumer);
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    consumed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        let producer_queue = Arc::clone(&queue);
        let produced_in_producer = Arc::clone(&produced);
        let producer = tokio::spawn(async move {
            for i in 0..20 {
                producer_queue.produce(format!("{i}")).await.unwrap();
                produced_in_producer.fetch_add(1, Ordering::SeqCst);
            }
        });

        producer.await.unwrap();
        queue.stop().await;

        assert_eq!(produced.load(Ordering::SeqCst), 20);
        assert_eq!(consumed.load(Ordering::SeqCst), 20);
    }
}
