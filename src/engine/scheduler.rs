// src/engine/scheduler.rs
//
// Bounded-concurrency worker pool draining a shared FIFO job queue.
//
// Each worker repeatedly pops the next pending job (one lock, no double
// processing), runs resample -> encode -> tag strictly in order, and records
// the terminal outcome. A job failure never aborts siblings; the run is over
// only when every job is terminal.

use crate::engine::encoder::encode;
use crate::engine::metadata::tag_resolution;
use crate::engine::planner::{Job, JobStatus, Source};
use crate::engine::resample::resample;
use crate::error::Result;
use crate::ops::{BackgroundStyle, ConcurrencyTier, FitMode, OutputFormat};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// One job status transition, delivered to observers in occurrence order
/// per job (Processing strictly before its terminal status).
#[derive(Clone, Debug)]
pub struct JobUpdate {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Observer for job status transitions. Implementations must tolerate
/// concurrent delivery from multiple workers.
pub trait JobObserver: Sync {
    fn on_status(&self, update: &JobUpdate);
}

/// Observer that ignores everything.
pub struct NullObserver;

impl JobObserver for NullObserver {
    fn on_status(&self, _update: &JobUpdate) {}
}

/// Cooperative cancellation handle.
///
/// Cancelling clears the queue of still-pending jobs; in-flight jobs finish
/// and their results are dropped by the caller. Workers are never interrupted
/// mid-job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run rendering parameters shared by every job.
#[derive(Clone, Copy, Debug)]
pub struct JobContext {
    pub mode: FitMode,
    pub background: BackgroundStyle,
    pub format: OutputFormat,
    pub dpi: Option<u16>,
}

/// Terminal outcome of one job: encoded output bytes or the error that
/// stopped it.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub result: Result<Vec<u8>>,
}

/// Bounded worker pool. Worker count comes from the concurrency tier and is
/// clamped to the job count at run time.
pub struct Scheduler {
    workers: usize,
}

impl Scheduler {
    pub fn new(tier: ConcurrencyTier) -> Self {
        Self {
            workers: tier.worker_count(),
        }
    }

    /// Drain `jobs` to terminal state. Returns one outcome per processed job;
    /// on cancellation, still-pending jobs are discarded and absent from the
    /// result.
    pub fn run(
        &self,
        sources: &[Source],
        jobs: Vec<Job>,
        ctx: JobContext,
        observer: &dyn JobObserver,
        cancel: Option<&CancelToken>,
    ) -> Vec<JobOutcome> {
        let job_count = jobs.len();
        if job_count == 0 {
            return Vec::new();
        }

        let worker_count = self.workers.min(job_count).max(1);
        debug!(jobs = job_count, workers = worker_count, "scheduler start");

        let queue: Mutex<VecDeque<Job>> = Mutex::new(jobs.into());
        let outcomes: Mutex<Vec<JobOutcome>> = Mutex::new(Vec::with_capacity(job_count));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .unwrap_or_else(|e| {
                // Fall back to a single-threaded pool rather than failing the run.
                warn!(error = %e, "worker pool build failed; falling back to one worker");
                rayon::ThreadPoolBuilder::new()
                    .num_threads(1)
                    .build()
                    .expect("single-thread pool")
            });

        pool.scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|_| {
                    worker_loop(&queue, &outcomes, sources, ctx, observer, cancel);
                });
            }
        });

        let outcomes = outcomes.into_inner();
        debug!(
            done = outcomes.iter().filter(|o| o.result.is_ok()).count(),
            errored = outcomes.iter().filter(|o| o.result.is_err()).count(),
            "scheduler finished"
        );
        outcomes
    }
}

fn worker_loop(
    queue: &Mutex<VecDeque<Job>>,
    outcomes: &Mutex<Vec<JobOutcome>>,
    sources: &[Source],
    ctx: JobContext,
    observer: &dyn JobObserver,
    cancel: Option<&CancelToken>,
) {
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            // Discard still-pending jobs; in-flight work in sibling workers
            // finishes on its own.
            queue.lock().clear();
            return;
        }

        let Some(job) = queue.lock().pop_front() else {
            return;
        };

        let source = &sources[job.source_idx];
        observer.on_status(&JobUpdate {
            job_id: job.id.clone(),
            status: JobStatus::Processing,
            message: format!(
                "Rendering {} at {}x{}",
                source.name, job.size.width, job.size.height
            ),
        });

        let result = process_job(source, &job, ctx);
        let update = match &result {
            Ok(bytes) => {
                debug!(job = %job.id, bytes = bytes.len(), "job done");
                JobUpdate {
                    job_id: job.id.clone(),
                    status: JobStatus::Done,
                    message: format!("Finished {}", job.id),
                }
            }
            Err(err) => {
                warn!(job = %job.id, error = %err, "job failed");
                JobUpdate {
                    job_id: job.id.clone(),
                    status: JobStatus::Error,
                    message: err.to_string(),
                }
            }
        };
        observer.on_status(&update);
        outcomes.lock().push(JobOutcome { job, result });
    }
}

/// Within a job, operations are strictly sequential:
/// resample -> encode -> tag.
fn process_job(source: &Source, job: &Job, ctx: JobContext) -> Result<Vec<u8>> {
    let buffer = resample(
        &source.pixels,
        job.size.width,
        job.size.height,
        ctx.mode,
        ctx.background,
    )?;
    let mut bytes = encode(&buffer, ctx.format, ctx.background)?;
    if let Some(dpi) = ctx.dpi {
        bytes = tag_resolution(bytes, ctx.format, dpi);
    }
    Ok(bytes)
}
