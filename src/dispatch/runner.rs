//! Bounded-parallelism task execution.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Results buffered per worker before workers wait on the consumer.
const RESULTS_PER_WORKER: usize = 4;

/// Runs `process` over a batch of items with bounded parallelism.
///
/// Every item is processed at most once. Results arrive on the returned
/// channel, which closes once all workers have stopped. After `cancel` fires
/// no new item is started; items already in flight still deliver a result.
pub trait TaskRunner: Send + Sync + 'static {
    fn work<I, T, E, F, Fut>(
        &self,
        cancel: CancellationToken,
        workers: usize,
        items: Vec<I>,
        process: F,
    ) -> mpsc::Receiver<Result<T, E>>
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static;
}

/// Default runner: `workers` tokio tasks pulling from a shared queue.
///
/// Each item runs in its own child task, so a panic inside `process` costs
/// that item's result and the worker moves on to the next one.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool;

impl TaskRunner for WorkerPool {
    fn work<I, T, E, F, Fut>(
        &self,
        cancel: CancellationToken,
        workers: usize,
        items: Vec<I>,
        process: F,
    ) -> mpsc::Receiver<Result<T, E>>
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let workers = workers.max(1).min(items.len().max(1));
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let process = Arc::new(process);
        let (tx, rx) = mpsc::channel(workers * RESULTS_PER_WORKER);

        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let process = Arc::clone(&process);
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let mut handled = 0usize;
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Some(item) = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front()
                    else {
                        break;
                    };

                    let result = match tokio::spawn(process(item)).await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!(worker, error = %e, "Item task failed, no result");
                            continue;
                        }
                    };
                    handled += 1;
                    if tx.send(result).await.is_err() {
                        // Receiver gone; nobody is listening for results.
                        break;
                    }
                }
                tracing::trace!(worker, handled, "Worker stopped");
            });
        }

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn drain<T, E>(mut rx: mpsc::Receiver<Result<T, E>>) -> Vec<Result<T, E>> {
        let mut out = Vec::new();
        while let Some(r) = rx.recv().await {
            out.push(r);
        }
        out
    }

    #[tokio::test]
    async fn test_every_item_once() {
        let items: Vec<u32> = (0..500).collect();
        let rx = WorkerPool.work(CancellationToken::new(), 8, items, |i| async move {
            if i % 7 == 0 {
                Err(i)
            } else {
                Ok(i)
            }
        });

        let results = drain(rx).await;
        assert_eq!(results.len(), 500);

        let seen: HashSet<u32> = results
            .iter()
            .map(|r| match r {
                Ok(i) | Err(i) => *i,
            })
            .collect();
        assert_eq!(seen.len(), 500);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 72);
    }

    #[tokio::test]
    async fn test_zero_workers_clamped() {
        let rx = WorkerPool.work(CancellationToken::new(), 0, vec![1, 2, 3], |i| async move {
            Ok::<_, ()>(i * 2)
        });
        let mut values: Vec<i32> = drain(rx).await.into_iter().map(|r| r.unwrap()).collect();
        values.sort();
        assert_eq!(values, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_empty_batch_closes_channel() {
        let rx = WorkerPool.work(CancellationToken::new(), 4, Vec::<u8>::new(), |i| async move {
            Ok::<_, ()>(i)
        });
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_parallelism_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let rx = WorkerPool.work(CancellationToken::new(), 5, (0..60).collect(), move |i: u32| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ()>(i)
            }
        });

        assert_eq!(drain(rx).await.len(), 60);
        assert!(peak.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn test_panicking_item_keeps_worker_alive() {
        let rx = WorkerPool.work(CancellationToken::new(), 2, (0..10).collect(), |i: u32| async move {
            if i == 3 || i == 4 {
                panic!("item {} exploded", i);
            }
            Ok::<_, ()>(i)
        });

        let mut values: Vec<u32> = drain(rx).await.into_iter().map(|r| r.unwrap()).collect();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 5, 6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let rx = WorkerPool.work(cancel, 4, (0..100).collect(), |i: u32| async move {
            Ok::<_, ()>(i)
        });
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_in_flight() {
        let cancel = CancellationToken::new();
        let started = Arc::new(AtomicUsize::new(0));

        let (c, s) = (cancel.clone(), Arc::clone(&started));
        let rx = WorkerPool.work(cancel, 4, (0..1000).collect(), move |i: u32| {
            let (cancel, started) = (c.clone(), Arc::clone(&s));
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if i == 10 {
                    cancel.cancel();
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok::<_, ()>(i)
            }
        });

        let delivered = drain(rx).await.len();
        assert_eq!(delivered, started.load(Ordering::SeqCst));
        assert!(delivered >= 11);
        assert!(delivered < 1000);
    }
}
