//! Generic parallel job queue
//!
//! Runs N independent jobs across a bounded pool of worker threads. The
//! parent pre-loads one job per worker, then dispatches the next pending job
//! every time a completion comes back, so each worker has at most one job
//! outstanding and jobs start in index order.
//!
//! Workers receive job indices over a bounded channel; a negative index is
//! the shutdown sentinel. A panicking job marks its worker dead: the
//! in-flight job counts as failed and the remaining jobs are drained by the
//! surviving workers. If every worker dies the queue returns early with the
//! rest of the jobs unattempted.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error};

/// Hard cap on concurrent workers.
pub const MAX_WORKERS: usize = 64;

/// Aggregated queue result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueOutcome {
    /// Jobs that ran and reported success.
    pub succeeded: usize,
    /// Jobs that ran and failed, or were in flight on a dead worker.
    pub failed: usize,
    /// Jobs never dispatched because every worker died first.
    pub unattempted: usize,
}

impl QueueOutcome {
    /// True when every job ran and succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.unattempted == 0
    }
}

/// What a worker reports back to the dispatcher.
enum Report {
    /// A job finished; `ok` is its success status.
    Completed { job: usize, ok: bool },
    /// The worker is gone. Carries the job it was holding, if any.
    WorkerDied { in_flight: Option<usize> },
}

/// A bounded-concurrency job executor.
#[derive(Debug, Clone, Copy)]
pub struct JobQueue {
    num_jobs: usize,
    workers: usize,
}

impl JobQueue {
    /// Creates a queue for `num_jobs` jobs with at most `max_workers`
    /// concurrent workers (additionally capped at [`MAX_WORKERS`] and at the
    /// job count).
    pub fn new(num_jobs: usize, max_workers: usize) -> JobQueue {
        let workers = max_workers.min(MAX_WORKERS).min(num_jobs).max(1);
        JobQueue { num_jobs, workers }
    }

    /// The effective worker count after capping.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs all jobs. `worker_init` is invoked once per worker before it
    /// accepts jobs; returning `false` retires that worker immediately.
    /// `job` is invoked with the job index and returns its success status.
    pub fn run<I, J>(&self, worker_init: I, job: J) -> QueueOutcome
    where
        I: Fn(usize) -> bool + Sync,
        J: Fn(usize) -> bool + Sync,
    {
        if self.num_jobs == 0 {
            return QueueOutcome::default();
        }

        // Job channel capacity equals the worker count: the parent only ever
        // has one outstanding index per worker, so sends never block.
        let (job_tx, job_rx) = bounded::<i32>(self.workers);
        let (report_tx, report_rx) = bounded::<Report>(self.workers);

        let outcome = std::thread::scope(|scope| {
            for worker_id in 0..self.workers {
                let job_rx = job_rx.clone();
                let report_tx = report_tx.clone();
                let worker_init = &worker_init;
                let job = &job;
                scope.spawn(move || {
                    worker_loop(worker_id, job_rx, report_tx, worker_init, job)
                });
            }
            // The dispatcher holds only its own clones.
            drop(job_rx);
            drop(report_tx);

            self.dispatch(&job_tx, &report_rx)
        });

        debug!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            unattempted = outcome.unattempted,
            "job queue finished"
        );
        outcome
    }

    /// Parent-side dispatch loop: pre-load one job per worker, then hand out
    /// the next pending job on every completion.
    fn dispatch(&self, job_tx: &Sender<i32>, report_rx: &Receiver<Report>) -> QueueOutcome {
        let mut next_job = 0usize;
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut dead_workers = 0usize;

        while next_job < self.workers && next_job < self.num_jobs {
            if job_tx.send(next_job as i32).is_err() {
                break;
            }
            next_job += 1;
        }

        while succeeded + failed < self.num_jobs {
            if dead_workers == self.workers {
                error!("all workers died; abandoning remaining jobs");
                break;
            }

            match report_rx.recv() {
                Ok(Report::Completed { job, ok }) => {
                    if ok {
                        succeeded += 1;
                    } else {
                        failed += 1;
                    }
                    debug!(job, ok, "job completed");
                    if next_job < self.num_jobs {
                        if job_tx.send(next_job as i32).is_err() {
                            break;
                        }
                        next_job += 1;
                    }
                }
                Ok(Report::WorkerDied { in_flight }) => {
                    dead_workers += 1;
                    if in_flight.is_some() {
                        failed += 1;
                    }
                }
                // Every worker hung up without reporting; nothing more will
                // complete.
                Err(_) => break,
            }
        }

        // Wake any still-idle workers with the shutdown sentinel. When the
        // loop exited early the channel may be gone already; that is fine.
        for _ in 0..self.workers.saturating_sub(dead_workers) {
            if job_tx.try_send(-1).is_err() {
                break;
            }
        }

        QueueOutcome {
            succeeded,
            failed,
            unattempted: self.num_jobs - succeeded - failed,
        }
    }
}

fn worker_loop<I, J>(
    worker_id: usize,
    job_rx: Receiver<i32>,
    report_tx: Sender<Report>,
    worker_init: &I,
    job: &J,
) where
    I: Fn(usize) -> bool,
    J: Fn(usize) -> bool,
{
    let init_ok = catch_unwind(AssertUnwindSafe(|| worker_init(worker_id))).unwrap_or(false);
    if !init_ok {
        error!(worker_id, "worker initialization failed");
        let _ = report_tx.send(Report::WorkerDied { in_flight: None });
        return;
    }

    loop {
        let index = match job_rx.recv() {
            Ok(index) => index,
            // Dispatcher hung up; treat like a shutdown sentinel.
            Err(_) => return,
        };
        if index < 0 {
            return;
        }
        let index = index as usize;

        match catch_unwind(AssertUnwindSafe(|| job(index))) {
            Ok(ok) => {
                if report_tx.send(Report::Completed { job: index, ok }).is_err() {
                    return;
                }
            }
            Err(_) => {
                error!(worker_id, job = index, "job panicked; retiring worker");
                let _ = report_tx.send(Report::WorkerDied {
                    in_flight: Some(index),
                });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_runs_every_job_exactly_once() {
        let runs: Vec<AtomicUsize> = (0..40).map(|_| AtomicUsize::new(0)).collect();

        let outcome = JobQueue::new(40, 4).run(
            |_| true,
            |index| {
                runs[index].fetch_add(1, Ordering::SeqCst);
                true
            },
        );

        assert_eq!(outcome.succeeded, 40);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.unattempted, 0);
        assert!(outcome.all_succeeded());
        for counter in &runs {
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_counts_failures() {
        let outcome = JobQueue::new(10, 3).run(|_| true, |index| index % 2 == 0);

        assert_eq!(outcome.succeeded, 5);
        assert_eq!(outcome.failed, 5);
        assert!(!outcome.all_succeeded());
    }

    #[test]
    fn test_worker_cap() {
        assert_eq!(JobQueue::new(100, 8).workers(), 8);
        assert_eq!(JobQueue::new(3, 8).workers(), 3);
        assert_eq!(JobQueue::new(1000, 1000).workers(), MAX_WORKERS);
        assert_eq!(JobQueue::new(5, 0).workers(), 1);
    }

    #[test]
    fn test_zero_jobs() {
        let outcome = JobQueue::new(0, 4).run(|_| true, |_| true);
        assert_eq!(outcome, QueueOutcome::default());
        assert!(outcome.all_succeeded());
    }

    #[test]
    fn test_jobs_start_in_index_order() {
        // With a single worker the execution order must be the index order,
        // which is what lets the caller front-load large jobs.
        let order = Mutex::new(Vec::new());

        JobQueue::new(6, 1).run(
            |_| true,
            |index| {
                order.lock().unwrap().push(index);
                true
            },
        );

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_large_job_starts_immediately() {
        // Job 0 is the straggler: it must be claimed at dispatch time, not
        // after the small jobs drain.
        let started_first = AtomicUsize::new(usize::MAX);

        JobQueue::new(8, 4).run(
            |_| true,
            |index| {
                let _ =
                    started_first.compare_exchange(usize::MAX, index, Ordering::SeqCst, Ordering::SeqCst);
                if index == 0 {
                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
                true
            },
        );

        // One of the initially dispatched indices (0..4) ran first; the
        // important property is that 0 was not deferred behind 4..8.
        assert!(started_first.load(Ordering::SeqCst) < 4);
    }

    #[test]
    fn test_panicking_job_counts_failed_and_pool_survives() {
        let runs = AtomicUsize::new(0);

        let outcome = JobQueue::new(12, 3).run(
            |_| true,
            |index| {
                if index == 4 {
                    panic!("simulated worker death");
                }
                runs.fetch_add(1, Ordering::SeqCst);
                true
            },
        );

        // The panicking job is one failure; all other jobs still ran.
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.succeeded, 11);
        assert_eq!(outcome.unattempted, 0);
        assert_eq!(runs.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_all_workers_dead_returns_early() {
        let outcome = JobQueue::new(20, 2).run(|_| true, |_| panic!("every job dies"));

        // Two workers die on their first jobs; the rest are unattempted.
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.unattempted, 18);
    }

    #[test]
    fn test_failed_init_retires_worker() {
        // Worker 0 never initializes; worker 1 handles everything.
        let outcome = JobQueue::new(6, 2).run(|worker_id| worker_id != 0, |_| true);

        assert_eq!(outcome.succeeded, 6);
        assert_eq!(outcome.failed, 0);
    }
}
