//! In-memory [`QueueClient`] adapter.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

use lf_core::{Error, Job, JobId};

use crate::QueueClient;

/// Terminal result reported for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Acked,
    Failed { reason: String },
}

/// Outcomes kept by [`MemoryQueue::new`].
pub const DEFAULT_OUTCOME_RETENTION: usize = 1024;

#[derive(Default)]
struct State {
    pending: VecDeque<Job>,
    in_flight: HashSet<JobId>,
    outcomes: HashMap<JobId, Outcome>,
    /// Ids in `outcomes`, oldest first.
    finished: VecDeque<JobId>,
}

/// FIFO queue held in process memory.
///
/// Ids that are pending or in flight cannot be enqueued again. There is no
/// redelivery: a failed job stays failed. Only the most recent outcomes are
/// kept.
pub struct MemoryQueue {
    state: Mutex<State>,
    available: Notify,
    outcome_retention: usize,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::with_outcome_retention(DEFAULT_OUTCOME_RETENTION)
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue remembering at most `retention` finished outcomes.
    pub fn with_outcome_retention(retention: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            available: Notify::new(),
            outcome_retention: retention,
        }
    }

    /// Number of jobs waiting to be dequeued.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of jobs dequeued but not yet acked or failed.
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// The recorded outcome for a job, if it has finished.
    pub fn outcome(&self, id: &JobId) -> Option<Outcome> {
        self.state.lock().outcomes.get(id).cloned()
    }

    fn finish(&self, id: &JobId, outcome: Outcome) -> lf_core::Result<()> {
        let mut state = self.state.lock();
        if !state.in_flight.remove(id) {
            return Err(Error::not_found("in-flight job", id));
        }
        state.outcomes.insert(id.clone(), outcome);
        state.finished.push_back(id.clone());
        while state.finished.len() > self.outcome_retention {
            let Some(oldest) = state.finished.pop_front() else {
                break;
            };
            state.outcomes.remove(&oldest);
        }
        Ok(())
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn enqueue(&self, job: Job) -> lf_core::Result<()> {
        {
            let mut state = self.state.lock();
            let id = &job.id;
            if state.in_flight.contains(id) || state.pending.iter().any(|j| &j.id == id) {
                return Err(Error::Conflict(format!("job {id} is already queued")));
            }
            // A finished id may be reused by a fresh upload.
            if state.outcomes.remove(id).is_some() {
                state.finished.retain(|f| f != id);
            }
            tracing::debug!(job_id = %id, "Enqueued job");
            state.pending.push_back(job);
        }
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> lf_core::Result<Job> {
        loop {
            // Register interest before checking so a concurrent enqueue's
            // permit is not lost.
            let notified = self.available.notified();
            {
                let mut state = self.state.lock();
                if let Some(job) = state.pending.pop_front() {
                    state.in_flight.insert(job.id.clone());
                    let more = !state.pending.is_empty();
                    drop(state);
                    if more {
                        // Pass the wakeup on in case another worker is waiting.
                        self.available.notify_one();
                    }
                    return Ok(job);
                }
            }
            notified.await;
        }
    }

    async fn ack(&self, id: &JobId) -> lf_core::Result<()> {
        self.finish(id, Outcome::Acked)
    }

    async fn fail(&self, id: &JobId, reason: &str) -> lf_core::Result<()> {
        self.finish(
            id,
            Outcome::Failed {
                reason: reason.to_string(),
            },
        )
    }
}
