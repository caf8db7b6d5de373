//! # lf-orchestrator
//!
//! The transcoding job orchestrator: a bounded [`WorkerPool`] pulls jobs from
//! a [`lf_queue::QueueClient`] and hands each to a [`JobRunner`], which
//! probes, plans the ladder, transcodes every rung in order, and finalizes or
//! aborts the job as a unit. [`JobTracker`] holds the status of every job the
//! process has seen.

pub mod pool;
pub mod runner;
pub mod tracker;

pub use pool::WorkerPool;
pub use runner::{JobOutcome, JobRunner};
pub use tracker::{JobRecord, JobTracker};

use lf_core::events::{EventBus, EventPayload};
use lf_core::Job;
use lf_queue::QueueClient;

/// Track a new job and put it on the queue.
///
/// Rejects the job with [`lf_core::Error::Conflict`] if a job with the same id
/// is still queued or running.
pub async fn submit(
    queue: &dyn QueueClient,
    tracker: &JobTracker,
    events: &EventBus,
    job: Job,
) -> lf_core::Result<()> {
    let job_id = job.id.clone();
    let replaced = tracker.track(job.clone())?;

    // Announce before enqueueing so a fast worker's JobStarted cannot precede it.
    events.broadcast(EventPayload::JobQueued {
        job_id: job_id.clone(),
    });

    if let Err(e) = queue.enqueue(job).await {
        match replaced {
            Some(previous) => tracker.restore(previous),
            None => tracker.forget(&job_id),
        }
        events.broadcast(EventPayload::JobFailed {
            job_id,
            error: e.to_string(),
        });
        return Err(e);
    }

    tracing::info!(job_id = %job_id, "Job queued");
    Ok(())
}
