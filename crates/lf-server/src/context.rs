//! Shared application context.
//!
//! [`AppContext`] is handed to every route handler via Axum state. It wraps
//! the queue, job tracker, event bus, and tool registry in `Arc`s so cloning
//! is cheap. `shutdown` fires once the process starts shutting down.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use lf_av::{Prober, RungTranscoder, ToolRegistry};
use lf_core::config::Config;
use lf_core::events::EventBus;
use lf_orchestrator::{JobRunner, JobTracker, WorkerPool};
use lf_queue::{MemoryQueue, QueueClient};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub queue: Arc<dyn QueueClient>,
    pub tracker: Arc<JobTracker>,
    pub event_bus: Arc<EventBus>,
    pub tools: Arc<ToolRegistry>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Build a context backed by an in-process [`MemoryQueue`].
    pub fn new(config: Config, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            queue: Arc::new(MemoryQueue::new()),
            tracker: Arc::new(JobTracker::new()),
            event_bus: Arc::new(EventBus::default()),
            tools,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build the worker pool that drains this context's queue.
    pub fn worker_pool(
        &self,
        prober: Arc<dyn Prober>,
        transcoder: Arc<dyn RungTranscoder>,
    ) -> WorkerPool {
        let runner = Arc::new(JobRunner::new(
            prober,
            transcoder,
            self.config.ladder.clone(),
            self.config.storage.output_dir.clone(),
            self.tracker.clone(),
            self.event_bus.clone(),
        ));
        WorkerPool::new(self.queue.clone(), runner, self.config.worker.concurrency)
    }
}
