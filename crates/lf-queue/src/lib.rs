//! # lf-queue
//!
//! The job queue seam. The orchestrator talks to its broker only through
//! [`QueueClient`]; [`MemoryQueue`] is the in-process adapter used by the
//! server and by tests.

pub mod memory;

use async_trait::async_trait;
use lf_core::{Job, JobId};

pub use memory::{MemoryQueue, Outcome};

/// Narrow broker interface consumed by the worker pool.
///
/// Implementations must be safe to share between all pool workers.
/// Retry and backoff after [`QueueClient::fail`] belong to the
/// implementation; the orchestrator never inspects them.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Add a job to the back of the queue.
    async fn enqueue(&self, job: Job) -> lf_core::Result<()>;

    /// Take the next job, waiting until one is available.
    async fn dequeue(&self) -> lf_core::Result<Job>;

    /// Report that a dequeued job succeeded.
    async fn ack(&self, id: &JobId) -> lf_core::Result<()>;

    /// Report that a dequeued job failed.
    async fn fail(&self, id: &JobId, reason: &str) -> lf_core::Result<()>;
}
