//! A queue that runs submitted async jobs strictly one after another.
//!
//! Jobs are accepted from any task without waiting. A background drain task
//! is spawned lazily on the first submission, owns the queue while work is
//! pending, and parks itself (by exiting) once the queue runs dry; the next
//! submission spawns a fresh one. At most one job is ever being polled, so
//! submission order is completion order.
//!
//! [`Sequential`](crate::Sequential) stacks three of these, one per
//! interceptor phase, to serialize a chatty interceptor across concurrently
//! in-flight exchanges.

use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Rejection returned by [`SequentialQueue::enqueue`] after the queue was
/// closed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sequential queue is closed")]
pub struct QueueClosed;

/// The job produced no output: it panicked, or the drain task was torn down
/// before it could run (e.g. at runtime shutdown).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sequential task aborted before completing")]
pub struct TaskAborted;

/// Runs submitted jobs one at a time, in submission order.
pub struct SequentialQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    idle: Notify,
}

struct Inner<T> {
    pending: VecDeque<Task<T>>,
    draining: bool,
    closed: bool,
}

struct Task<T> {
    job: BoxFuture<'static, T>,
    done: oneshot::Sender<T>,
}

impl<T: Send + 'static> SequentialQueue<T> {
    pub fn new() -> Self {
        let inner = Inner { pending: VecDeque::new(), draining: false, closed: false };
        Self { shared: Arc::new(Shared { inner: Mutex::new(inner), idle: Notify::new() }) }
    }

    /// Accepts `job` and returns a [`Completion`] resolving to its output.
    ///
    /// The job runs after every previously accepted job has finished, even
    /// when the returned completion is dropped. Must be called from within a
    /// tokio runtime.
    pub fn enqueue<F>(&self, job: F) -> Result<Completion<T>, QueueClosed>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (done, outcome) = oneshot::channel();
        let start_drain = {
            let mut inner = self.shared.lock();
            if inner.closed {
                return Err(QueueClosed);
            }
            inner.pending.push_back(Task { job: job.boxed(), done });
            trace!(pending = inner.pending.len(), "queued sequential task");
            if inner.draining {
                false
            } else {
                inner.draining = true;
                true
            }
        };
        if start_drain {
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }
        Ok(Completion { outcome })
    }

    /// Stops accepting new jobs and waits until every already accepted job
    /// has run to completion.
    pub async fn close(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // register for the wakeup before checking, or the drain task
            // could go idle in between and the notification would be lost
            notified.as_mut().enable();
            {
                let mut inner = self.shared.lock();
                inner.closed = true;
                if !inner.draining {
                    return;
                }
            }
            notified.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<T: Send + 'static> Default for SequentialQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SequentialQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("SequentialQueue")
            .field("pending", &inner.pending.len())
            .field("draining", &inner.draining)
            .field("closed", &inner.closed)
            .finish()
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn drain<T: Send + 'static>(shared: Arc<Shared<T>>) {
    loop {
        let task = {
            let mut inner = shared.lock();
            match inner.pending.pop_front() {
                Some(task) => task,
                None => {
                    inner.draining = false;
                    drop(inner);
                    trace!("sequential queue drained, parking");
                    shared.idle.notify_waiters();
                    return;
                }
            }
        };
        match AssertUnwindSafe(task.job).catch_unwind().await {
            // the submitter may have dropped its completion
            Ok(value) => {
                let _ = task.done.send(value);
            }
            // dropping `done` surfaces as TaskAborted; the queue keeps going
            Err(_payload) => warn!("sequential task panicked"),
        }
    }
}

/// Future side of an accepted job, resolving to the job's output.
#[derive(Debug)]
pub struct Completion<T> {
    outcome: oneshot::Receiver<T>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T, TaskAborted>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(self.get_mut().outcome.poll_unpin(cx)) {
            Ok(value) => Poll::Ready(Ok(value)),
            Err(oneshot::Canceled) => Poll::Ready(Err(TaskAborted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use crate::queue::{QueueClosed, SequentialQueue};

    fn check_send<T: Send>() {}

    #[test]
    fn is_send() {
        check_send::<SequentialQueue<usize>>();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_jobs_complete_in_submission_order() {
        let queue = SequentialQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let slow_order = Arc::clone(&order);
        let slow = queue
            .enqueue(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                slow_order.lock().unwrap().push("slow");
                1
            })
            .unwrap();

        let fast_order = Arc::clone(&order);
        let fast = queue
            .enqueue(async move {
                fast_order.lock().unwrap().push("fast");
                2
            })
            .unwrap();

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow.unwrap(), 1);
        assert_eq!(fast.unwrap(), 2);
        assert_eq!(*order.lock().unwrap(), vec!["slow", "fast"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_jobs_never_overlap() {
        let queue = SequentialQueue::new();
        let started = Instant::now();

        let first = queue
            .enqueue(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            })
            .unwrap();
        let second = queue
            .enqueue(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
            })
            .unwrap();

        let (first, second) = tokio::join!(first, second);
        first.unwrap();
        second.unwrap();

        // overlapping execution would finish in ~50ms
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_drain_restarts_after_going_idle() {
        let queue = SequentialQueue::new();

        assert_eq!(queue.enqueue(async { 1 }).unwrap().await.unwrap(), 1);

        // the drain task has parked itself by now (give it a beat)
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(queue.enqueue(async { 2 }).unwrap().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_job_runs_even_when_completion_is_dropped() {
        let queue = SequentialQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let job_hits = Arc::clone(&hits);
        let completion = queue.enqueue(async move {
            job_hits.fetch_add(1, Ordering::SeqCst);
        });
        drop(completion);

        queue.close().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_close_rejects_new_jobs() {
        let queue = SequentialQueue::<usize>::new();
        queue.close().await;

        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(async { 1 }).unwrap_err(), QueueClosed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_panicking_job_does_not_wedge_the_queue() {
        let queue = SequentialQueue::new();

        let poisoned = queue.enqueue(async { panic!("job blew up") }).unwrap();
        let healthy = queue.enqueue(async { 7 }).unwrap();

        assert_eq!(poisoned.await.unwrap_err(), crate::queue::TaskAborted);
        assert_eq!(healthy.await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_close_waits_for_accepted_jobs() {
        let queue = SequentialQueue::new();
        let started = Instant::now();

        let completion = queue
            .enqueue(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                "done"
            })
            .unwrap();

        queue.close().await;
        assert!(started.elapsed() >= Duration::from_millis(50));

        // the accepted job ran to completion before close returned
        assert_eq!(completion.await.unwrap(), "done");
    }
}
