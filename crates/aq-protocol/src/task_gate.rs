//! Bounded spawner for post-ack asynchronous work.
//!
//! Handlers ack on receipt and hand the real work to a task.  The gate
//! bounds how many of those jobs run at once; a job queues on the
//! semaphore inside its own task, so the ack path never waits.  Panics
//! stay inside the spawned task.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct TaskGate {
    permits: Arc<Semaphore>,
}

impl TaskGate {
    /// Gate allowing at most `limit` jobs in flight.
    pub fn new(limit: usize) -> Self {
        TaskGate {
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Spawn `job`, running it once a permit is available.
    pub fn spawn<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            // Closed only if the gate itself is dropped mid-shutdown.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn runs_jobs() {
        let gate = TaskGate::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = counter.clone();
            gate.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn bounds_in_flight_jobs() {
        let gate = TaskGate::new(1);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            gate.spawn(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_job_does_not_poison_the_gate() {
        let gate = TaskGate::new(1);
        gate.spawn(async { panic!("boom") });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        gate.spawn(async move {
            d.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
