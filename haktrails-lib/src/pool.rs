//! Worker pool over a shared work channel.
//!
//! A single producer feeds a bounded channel; N workers share the receiving
//! half and each loops receive-or-exit until the channel is closed and
//! drained. [`WorkerPool::run`] returns only after every worker has
//! returned, so no remote call or output write is still in flight.

use crate::error::TrailsError;
use crate::types::WorkItem;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Create the shared work channel.
///
/// The channel is bounded, so a fast producer blocks instead of buffering
/// the whole input.
pub fn work_channel(capacity: usize) -> (mpsc::Sender<WorkItem>, WorkQueue) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        sender,
        WorkQueue {
            receiver: Arc::new(Mutex::new(receiver)),
        },
    )
}

/// Receiving side of the work channel, shared by all workers.
#[derive(Clone)]
pub struct WorkQueue {
    receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl WorkQueue {
    /// Next item, or `None` once the channel is closed and empty.
    ///
    /// The lock is held only while waiting for this one item, so each item
    /// goes to exactly one worker.
    pub async fn next(&self) -> Option<WorkItem> {
        self.receiver.lock().await.recv().await
    }
}

/// Per-worker logic driven by the pool.
#[async_trait]
pub trait Worker: Send + 'static {
    /// Handle one item. Failures are the worker's to report; they never
    /// stop the pool.
    async fn handle(&mut self, item: WorkItem);

    /// Called once after the channel is closed and drained.
    async fn finish(&mut self) {}
}

/// How a pool run ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Items handled by each worker that returned normally, by worker id
    pub per_worker: Vec<usize>,
    /// Workers that panicked
    pub failed_workers: usize,
}

impl PoolReport {
    /// Total items handled.
    pub fn total(&self) -> usize {
        self.per_worker.iter().sum()
    }

    /// Workers that ran to completion.
    pub fn completed_workers(&self) -> usize {
        self.per_worker.len()
    }
}

/// Fixed-size pool of identical workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Create a pool of `size` workers. Zero is a configuration error.
    pub fn new(size: usize) -> Result<Self, TrailsError> {
        if size == 0 {
            return Err(TrailsError::config("Concurrency must be at least 1"));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawn the workers and wait for all of them.
    ///
    /// `make_worker` is called once per worker with its id.
    pub async fn run<W, F>(&self, queue: WorkQueue, make_worker: F) -> PoolReport
    where
        W: Worker,
        F: Fn(usize) -> W,
    {
        tracing::info!("starting {} workers", self.size);

        let handles: Vec<_> = (0..self.size)
            .map(|id| {
                let queue = queue.clone();
                let mut worker = make_worker(id);
                tokio::spawn(async move {
                    let mut handled = 0usize;
                    while let Some(item) = queue.next().await {
                        worker.handle(item).await;
                        handled += 1;
                    }
                    worker.finish().await;
                    tracing::debug!("worker {} done after {} items", id, handled);
                    handled
                })
            })
            .collect();
        // Workers hold the only receivers; once they exit the producer sees
        // a closed channel.
        drop(queue);

        let mut report = PoolReport::default();
        for (id, outcome) in futures::future::join_all(handles)
            .await
            .into_iter()
            .enumerate()
        {
            match outcome {
                Ok(handled) => report.per_worker.push(handled),
                Err(e) => {
                    tracing::error!("worker {} failed: {}", id, e);
                    report.failed_workers += 1;
                }
            }
        }

        tracing::info!(
            "all workers finished: {} items across {} workers",
            report.total(),
            report.completed_workers()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct Recorder {
        id: usize,
        seen: Arc<StdMutex<Vec<(usize, WorkItem)>>>,
        finished: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl Worker for Recorder {
        async fn handle(&mut self, item: WorkItem) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.seen.lock().unwrap().push((self.id, item));
        }

        async fn finish(&mut self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn run_pool(
        workers: usize,
        items: usize,
        delay: Duration,
    ) -> (PoolReport, Vec<(usize, WorkItem)>, usize) {
        let pool = WorkerPool::new(workers).unwrap();
        let (tx, queue) = work_channel(workers);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let finished = Arc::new(AtomicUsize::new(0));

        let producer = tokio::spawn(async move {
            for i in 0..items {
                tx.send(format!("{}.com", i)).await.unwrap();
            }
        });

        let report = pool
            .run(queue, |id| Recorder {
                id,
                seen: seen.clone(),
                finished: finished.clone(),
                delay,
            })
            .await;
        producer.await.unwrap();

        let seen = seen.lock().unwrap().clone();
        (report, seen, finished.load(Ordering::SeqCst))
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = WorkerPool::new(0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_item_delivered_once() {
        for workers in [1, 2, 3, 8] {
            let (report, seen, finished) = run_pool(workers, 50, Duration::ZERO).await;

            assert_eq!(report.total(), 50);
            assert_eq!(report.completed_workers(), workers);
            assert_eq!(finished, workers);

            let mut counts: HashMap<WorkItem, usize> = HashMap::new();
            for (_, item) in seen {
                *counts.entry(item).or_default() += 1;
            }
            assert_eq!(counts.len(), 50);
            assert!(counts.values().all(|&c| c == 1));
        }
    }

    #[tokio::test]
    async fn test_more_workers_than_items() {
        let (report, seen, finished) = run_pool(5, 2, Duration::ZERO).await;
        assert_eq!(report.total(), 2);
        assert_eq!(report.completed_workers(), 5);
        assert_eq!(finished, 5);
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn test_single_worker_keeps_input_order() {
        let (_, seen, _) = run_pool(1, 10, Duration::from_millis(1)).await;
        let items: Vec<WorkItem> = seen.into_iter().map(|(_, item)| item).collect();
        let expected: Vec<WorkItem> = (0..10).map(|i| format!("{}.com", i)).collect();
        assert_eq!(items, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_work_is_spread_across_workers() {
        let (report, seen, _) = run_pool(4, 40, Duration::from_millis(5)).await;
        assert_eq!(report.total(), 40);
        let busy: std::collections::HashSet<usize> = seen.iter().map(|(id, _)| *id).collect();
        assert!(busy.len() > 1, "only one worker did any work");
    }

    #[tokio::test]
    async fn test_run_waits_for_slow_workers() {
        let (report, seen, finished) = run_pool(3, 6, Duration::from_millis(20)).await;
        // Nothing can still be in flight once run() has returned.
        assert_eq!(seen.len(), 6);
        assert_eq!(report.total(), 6);
        assert_eq!(finished, 3);
    }
}
