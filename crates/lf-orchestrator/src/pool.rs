//! Bounded worker pool.
//!
//! [`WorkerPool::run`] starts `concurrency` workers. Each worker loops:
//! dequeue one job, run it to a terminal state, report the outcome to the
//! queue. A worker holds at most one job, so at most `concurrency` jobs run at
//! once. Cancellation stops workers from taking new jobs; a job already taken
//! runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use lf_core::Job;
use lf_queue::QueueClient;

use crate::runner::{JobOutcome, JobRunner};

/// Pause after a failed dequeue before trying again.
const DEQUEUE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A fixed number of workers sharing one queue and one runner.
#[derive(Clone)]
pub struct WorkerPool {
    queue: Arc<dyn QueueClient>,
    runner: Arc<JobRunner>,
    concurrency: usize,
}

impl WorkerPool {
    /// `concurrency` is clamped to at least one worker.
    pub fn new(queue: Arc<dyn QueueClient>, runner: Arc<JobRunner>, concurrency: usize) -> Self {
        Self {
            queue,
            runner,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run all workers until `cancel` fires and every in-flight job is done.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(concurrency = self.concurrency, "Worker pool started");

        let mut workers = JoinSet::new();
        for worker in 0..self.concurrency {
            let pool = self.clone();
            let cancel = cancel.clone();
            workers.spawn(async move { pool.worker_loop(worker, cancel).await });
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task ended abnormally: {e}");
            }
        }

        tracing::info!("Worker pool stopped");
    }

    /// Dequeue and process exactly one job.
    pub async fn run_next(&self) -> lf_core::Result<JobOutcome> {
        let job = self.queue.dequeue().await?;
        Ok(self.process(0, job).await)
    }

    async fn worker_loop(&self, worker: usize, cancel: CancellationToken) {
        tracing::debug!(worker, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.queue.dequeue() => next,
            };

            match next {
                Ok(job) => {
                    self.process(worker, job).await;
                }
                Err(e) => {
                    tracing::error!(worker, "Dequeue failed: {e}");
                    tokio::select! {
                        _ = tokio::time::sleep(DEQUEUE_RETRY_DELAY) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }

        tracing::debug!(worker, "Worker stopped");
    }

    async fn process(&self, worker: usize, job: Job) -> JobOutcome {
        tracing::info!(worker, job_id = %job.id, "Job dequeued");

        let outcome = self.runner.run(&job).await;

        let report = match &outcome {
            JobOutcome::Succeeded { .. } => self.queue.ack(&job.id).await,
            JobOutcome::Failed { reason } => self.queue.fail(&job.id, reason).await,
        };
        if let Err(e) = report {
            tracing::error!(job_id = %job.id, "Failed to report job outcome to queue: {e}");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lf_av::{Artifacts, Prober, RungTranscoder};
    use lf_core::events::EventBus;
    use lf_core::{Catalog, Error, JobStatus, Rung, SourceDimensions};
    use lf_queue::{MemoryQueue, Outcome};

    use crate::tracker::JobTracker;

    /// Reports a height taken from the file name: `<anything>-<height>.mp4`.
    struct NameProber;

    #[async_trait]
    impl Prober for NameProber {
        fn name(&self) -> &'static str {
            "name"
        }

        async fn probe(&self, path: &Path) -> lf_core::Result<SourceDimensions> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            let height = stem
                .rsplit('-')
                .next()
                .and_then(|h| h.parse::<u32>().ok())
                .ok_or_else(|| Error::Probe(format!("no height in {stem}")))?;
            Ok(SourceDimensions::new(height * 16 / 9, height))
        }
    }

    /// Sleeps per rung and tracks how many rungs run at once.
    #[derive(Default)]
    struct SlowTranscoder {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RungTranscoder for SlowTranscoder {
        async fn transcode(
            &self,
            _source: &Path,
            output_dir: &Path,
            rung: &Rung,
        ) -> lf_core::Result<Artifacts> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(Artifacts::for_rung(output_dir, rung))
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        queue: Arc<MemoryQueue>,
        tracker: Arc<JobTracker>,
        transcoder: Arc<SlowTranscoder>,
        pool: WorkerPool,
    }

    fn fixture(concurrency: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(MemoryQueue::new());
        let tracker = Arc::new(JobTracker::new());
        let transcoder = Arc::new(SlowTranscoder::default());
        let runner = Arc::new(JobRunner::new(
            Arc::new(NameProber),
            transcoder.clone(),
            Catalog::standard(),
            dir.path().join("videos"),
            tracker.clone(),
            Arc::new(EventBus::default()),
        ));
        let pool = WorkerPool::new(queue.clone(), runner, concurrency);
        Fixture {
            dir,
            queue,
            tracker,
            transcoder,
            pool,
        }
    }

    fn source(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}.mp4"));
        std::fs::write(&path, b"src").unwrap();
        path
    }

    async fn wait_until_finished(tracker: &JobTracker, total: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let done = tracker.count_with_status(JobStatus::Succeeded)
                + tracker.count_with_status(JobStatus::Failed);
            if done == total {
                return;
            }
            assert!(tokio::time::Instant::now() < deadline, "jobs did not finish");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_concurrency() {
        let f = fixture(2);
        for i in 0..6 {
            let job = Job::from_source(source(f.dir.path(), &format!("clip{i}-360"))).unwrap();
            f.queue.enqueue(job).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(f.pool.clone().run(cancel.clone()));

        wait_until_finished(&f.tracker, 6).await;
        cancel.cancel();
        handle.await.unwrap();

        // One rung at a time per job, so peak rungs == peak jobs.
        let peak = f.transcoder.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency {peak}");
        assert!(peak >= 1);
        assert_eq!(f.tracker.count_with_status(JobStatus::Succeeded), 6);
    }

    #[tokio::test]
    async fn outcomes_are_reported_to_queue() {
        let f = fixture(1);
        let good = Job::from_source(source(f.dir.path(), "good-720")).unwrap();
        let bad = Job::from_source(source(f.dir.path(), "bad-x")).unwrap();
        f.queue.enqueue(good.clone()).await.unwrap();
        f.queue.enqueue(bad.clone()).await.unwrap();

        assert!(f.pool.run_next().await.unwrap().is_success());
        assert!(!f.pool.run_next().await.unwrap().is_success());

        assert_eq!(f.queue.outcome(&good.id), Some(Outcome::Acked));
        match f.queue.outcome(&bad.id) {
            Some(Outcome::Failed { reason }) => assert!(reason.contains("no height")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Source removed only for the successful job.
        assert!(!good.source_path.exists());
        assert!(bad.source_path.exists());
    }

    #[tokio::test]
    async fn cancel_stops_idle_workers() {
        let f = fixture(3);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(f.pool.clone().run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("pool did not stop")
            .unwrap();
        assert_eq!(f.queue.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn cancel_lets_running_job_finish() {
        let f = fixture(1);
        let running = Job::from_source(source(f.dir.path(), "running-480")).unwrap();
        let waiting = Job::from_source(source(f.dir.path(), "waiting-480")).unwrap();
        f.queue.enqueue(running.clone()).await.unwrap();
        f.queue.enqueue(waiting.clone()).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(f.pool.clone().run(cancel.clone()));

        // Cancel while the first rung is encoding.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while f.transcoder.current.load(Ordering::SeqCst) == 0 {
            assert!(tokio::time::Instant::now() < deadline, "job never started");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pool did not stop")
            .unwrap();

        let record = f.tracker.get(&running.id).unwrap();
        assert_eq!(record.job.status, JobStatus::Succeeded);
        assert_eq!(record.completed_rungs, ["480p", "720p", "1080p"]);
        assert_eq!(f.queue.outcome(&running.id), Some(Outcome::Acked));

        // The second job was never taken.
        assert_eq!(f.queue.pending_len(), 1);
        assert!(f.tracker.get(&waiting.id).is_none());
        assert!(waiting.source_path.exists());
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let f = fixture(0);
        assert_eq!(f.pool.concurrency(), 1);
    }
}
