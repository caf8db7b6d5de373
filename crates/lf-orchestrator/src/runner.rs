//! The per-job procedure.
//!
//! A [`JobRunner`] takes one dequeued job from `Running` to a terminal state:
//! probe, plan, transcode each rung in ladder order, then delete the source
//! on success. Any error fails the whole job; earlier rung artifacts and the
//! source are left on disk.

use std::path::PathBuf;
use std::sync::Arc;

use lf_av::transcode::layout;
use lf_av::{Artifacts, Prober, RungTranscoder};
use lf_core::events::{EventBus, EventPayload};
use lf_core::{Catalog, Job, JobId};

use crate::tracker::JobTracker;

/// Terminal result of running one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every planned rung was produced; `artifacts` is empty for an empty
    /// ladder.
    Succeeded { artifacts: Vec<Artifacts> },
    Failed { reason: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Runs jobs against injected prober and transcoder backends.
pub struct JobRunner {
    prober: Arc<dyn Prober>,
    transcoder: Arc<dyn RungTranscoder>,
    catalog: Catalog,
    output_root: PathBuf,
    tracker: Arc<JobTracker>,
    events: Arc<EventBus>,
}

impl JobRunner {
    pub fn new(
        prober: Arc<dyn Prober>,
        transcoder: Arc<dyn RungTranscoder>,
        catalog: Catalog,
        output_root: impl Into<PathBuf>,
        tracker: Arc<JobTracker>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            prober,
            transcoder,
            catalog,
            output_root: output_root.into(),
            tracker,
            events,
        }
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    /// Run a job to completion. Never returns an error: every failure is
    /// folded into [`JobOutcome::Failed`].
    pub async fn run(&self, job: &Job) -> JobOutcome {
        let job_id = job.id.clone();

        if let Err(e) = self.tracker.start(job) {
            // A record in the wrong state means the id is being reused while
            // live; leave that record alone.
            tracing::error!(job_id = %job_id, error = %e, "Cannot start job");
            return JobOutcome::Failed {
                reason: e.to_string(),
            };
        }
        tracing::info!(job_id = %job_id, source = %job.source_path.display(), "Processing job");
        self.events.broadcast(EventPayload::JobStarted {
            job_id: job_id.clone(),
        });

        match self.execute(job).await {
            Ok(artifacts) => {
                self.remove_source(job).await;
                self.settle(&job_id, self.tracker.succeed(&job_id));
                tracing::info!(job_id = %job_id, rungs = artifacts.len(), "Job succeeded");
                self.events.broadcast(EventPayload::JobSucceeded { job_id });
                JobOutcome::Succeeded { artifacts }
            }
            Err(e) => {
                let reason = e.to_string();
                self.settle(&job_id, self.tracker.fail(&job_id, &reason));
                tracing::error!(job_id = %job_id, error = %reason, "Job failed");
                self.events.broadcast(EventPayload::JobFailed {
                    job_id,
                    error: reason.clone(),
                });
                JobOutcome::Failed { reason }
            }
        }
    }

    async fn execute(&self, job: &Job) -> lf_core::Result<Vec<Artifacts>> {
        let job_id = &job.id;
        let source = job.source_path();

        let dims = self.prober.probe(source).await?;
        let ladder = self.catalog.plan(dims);

        let labels: Vec<String> = ladder.iter().map(|r| r.label.clone()).collect();
        tracing::info!(job_id = %job_id, source = %dims, ladder = ?labels, "Ladder planned");
        self.events.broadcast(EventPayload::LadderPlanned {
            job_id: job_id.clone(),
            source: dims,
            rungs: labels,
        });

        let mut artifacts = Vec::with_capacity(ladder.len());
        for rung in &ladder {
            let rung_dir = layout::rung_dir(&self.output_root, job_id, rung);

            tracing::info!(job_id = %job_id, rung = %rung.label, "Rung started");
            self.events.broadcast(EventPayload::RungStarted {
                job_id: job_id.clone(),
                rung: rung.label.clone(),
            });

            let produced = self
                .transcoder
                .transcode(source, &rung_dir, rung)
                .await
                .map_err(|e| {
                    tracing::warn!(job_id = %job_id, rung = %rung.label, error = %e, "Rung failed");
                    e
                })?;

            self.tracker.rung_completed(job_id, &rung.label)?;
            tracing::info!(job_id = %job_id, rung = %rung.label, "Rung completed");
            self.events.broadcast(EventPayload::RungCompleted {
                job_id: job_id.clone(),
                rung: rung.label.clone(),
            });
            artifacts.push(produced);
        }

        Ok(artifacts)
    }

    /// Best-effort source removal after success.
    async fn remove_source(&self, job: &Job) {
        match tokio::fs::remove_file(job.source_path()).await {
            Ok(()) => {
                tracing::debug!(job_id = %job.id, "Removed source {}", job.source_path.display());
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job.id,
                    "Failed to remove source {}: {e}",
                    job.source_path.display()
                );
            }
        }
    }

    fn settle(&self, job_id: &JobId, result: lf_core::Result<()>) {
        if let Err(e) = result {
            tracing::error!(job_id = %job_id, error = %e, "Failed to record job status");
        }
    }
}
