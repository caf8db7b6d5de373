//! In-process job status registry.
//!
//! Live jobs are always kept. Finished records are kept up to a retention
//! limit, oldest finished dropped first.

use std::collections::VecDeque;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use lf_core::{Error, Job, JobId, JobStatus};

/// Status of one job plus the rungs it has finished so far.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(flatten)]
    pub job: Job,
    pub completed_rungs: Vec<String>,
}

/// Finished records kept by [`JobTracker::new`].
pub const DEFAULT_FINISHED_RETENTION: usize = 1024;

/// Concurrent map of job id to [`JobRecord`].
#[derive(Debug)]
pub struct JobTracker {
    records: DashMap<JobId, JobRecord>,
    /// Finished ids, oldest first.
    finished: Mutex<VecDeque<JobId>>,
    finished_retention: usize,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::with_finished_retention(DEFAULT_FINISHED_RETENTION)
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker keeping at most `retention` finished records.
    pub fn with_finished_retention(retention: usize) -> Self {
        Self {
            records: DashMap::new(),
            finished: Mutex::new(VecDeque::new()),
            finished_retention: retention,
        }
    }

    /// Start tracking a queued job.
    ///
    /// A finished record with the same id is replaced and returned; a live
    /// one is a conflict.
    pub fn track(&self, job: Job) -> lf_core::Result<Option<JobRecord>> {
        let id = job.id.clone();
        let replaced = match self.records.entry(id.clone()) {
            Entry::Occupied(mut e) => {
                if !e.get().job.status.is_terminal() {
                    return Err(Error::Conflict(format!(
                        "job {} is already {}",
                        job.id,
                        e.get().job.status
                    )));
                }
                Some(e.insert(JobRecord::new(job)))
            }
            Entry::Vacant(e) => {
                e.insert(JobRecord::new(job));
                None
            }
        };
        if replaced.is_some() {
            self.finished.lock().retain(|f| f != &id);
        }
        Ok(replaced)
    }

    /// Drop a record, e.g. after the queue refused the job.
    pub fn forget(&self, id: &JobId) {
        self.records.remove(id);
        self.finished.lock().retain(|f| f != id);
    }

    /// Put back a record that [`JobTracker::track`] replaced.
    pub fn restore(&self, record: JobRecord) {
        let id = record.job.id.clone();
        let finished = record.job.status.is_terminal();
        self.records.insert(id.clone(), record);
        if finished {
            self.note_finished(id);
        }
    }

    /// Mark a job running, tracking it first if it arrived from elsewhere.
    pub fn start(&self, job: &Job) -> lf_core::Result<()> {
        let mut record = self
            .records
            .entry(job.id.clone())
            .or_insert_with(|| JobRecord::new(job.clone()));
        record.job.start()
    }

    pub fn rung_completed(&self, id: &JobId, label: &str) -> lf_core::Result<()> {
        let mut record = self.get_mut(id)?;
        record.completed_rungs.push(label.to_string());
        Ok(())
    }

    pub fn succeed(&self, id: &JobId) -> lf_core::Result<()> {
        self.get_mut(id)?.job.succeed()?;
        self.note_finished(id.clone());
        Ok(())
    }

    pub fn fail(&self, id: &JobId, reason: &str) -> lf_core::Result<()> {
        self.get_mut(id)?.job.fail(reason)?;
        self.note_finished(id.clone());
        Ok(())
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.records.get(id).map(|r| r.clone())
    }

    /// All records, ordered by id.
    pub fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.records.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| a.job.id.cmp(&b.job.id));
        records
    }

    pub fn count_with_status(&self, status: JobStatus) -> usize {
        self.records
            .iter()
            .filter(|r| r.job.status == status)
            .count()
    }

    fn get_mut(
        &self,
        id: &JobId,
    ) -> lf_core::Result<dashmap::mapref::one::RefMut<'_, JobId, JobRecord>> {
        self.records
            .get_mut(id)
            .ok_or_else(|| Error::not_found("job", id))
    }

    fn note_finished(&self, id: JobId) {
        let mut finished = self.finished.lock();
        finished.push_back(id);
        while finished.len() > self.finished_retention {
            let Some(oldest) = finished.pop_front() else {
                break;
            };
            // A re-submitted id may be live again.
            self.records.remove_if(&oldest, |_, r| r.job.status.is_terminal());
        }
    }
}

impl JobRecord {
    fn new(job: Job) -> Self {
        Self {
            job,
            completed_rungs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> Job {
        Job::from_source(format!("/uploads/{name}.mp4")).unwrap()
    }

    #[test]
    fn lifecycle() {
        let tracker = JobTracker::new();
        let j = job("clip");
        tracker.track(j.clone()).unwrap();
        assert_eq!(tracker.count_with_status(JobStatus::Queued), 1);

        tracker.start(&j).unwrap();
        tracker.rung_completed(&j.id, "720p").unwrap();
        tracker.succeed(&j.id).unwrap();

        let record = tracker.get(&j.id).unwrap();
        assert_eq!(record.job.status, JobStatus::Succeeded);
        assert_eq!(record.completed_rungs, vec!["720p"]);
    }

    #[test]
    fn live_duplicate_conflicts() {
        let tracker = JobTracker::new();
        let j = job("clip");
        tracker.track(j.clone()).unwrap();
        assert!(matches!(tracker.track(j.clone()), Err(Error::Conflict(_))));

        tracker.start(&j).unwrap();
        tracker.fail(&j.id, "boom").unwrap();
        // Finished records can be replaced.
        tracker.track(j.clone()).unwrap();
        assert_eq!(tracker.get(&j.id).unwrap().job.status, JobStatus::Queued);
    }

    #[test]
    fn start_untracked_job() {
        let tracker = JobTracker::new();
        let j = job("direct");
        tracker.start(&j).unwrap();
        assert_eq!(tracker.get(&j.id).unwrap().job.status, JobStatus::Running);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let tracker = JobTracker::new();
        let j = job("clip");
        tracker.track(j.clone()).unwrap();
        assert!(tracker.succeed(&j.id).is_err());
        assert!(tracker.fail(&JobId::new("nope").unwrap(), "x").is_err());
    }

    #[test]
    fn record_serializes_flat_camel_case() {
        let tracker = JobTracker::new();
        let j = job("clip");
        tracker.start(&j).unwrap();
        tracker.fail(&j.id, "probe failed").unwrap();

        let value = serde_json::to_value(tracker.get(&j.id).unwrap()).unwrap();
        assert_eq!(value["id"], "clip");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["failureReason"], "probe failed");
        assert_eq!(value["sourcePath"], "/uploads/clip.mp4");
        assert!(value["completedRungs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn track_returns_replaced_record() {
        let tracker = JobTracker::new();
        let j = job("clip");
        assert!(tracker.track(j.clone()).unwrap().is_none());
        tracker.start(&j).unwrap();
        tracker.succeed(&j.id).unwrap();

        let previous = tracker.track(j.clone()).unwrap().unwrap();
        assert_eq!(previous.job.status, JobStatus::Succeeded);

        tracker.restore(previous);
        assert_eq!(tracker.get(&j.id).unwrap().job.status, JobStatus::Succeeded);
    }

    #[test]
    fn finished_records_are_pruned_oldest_first() {
        let tracker = JobTracker::with_finished_retention(2);
        for name in ["a", "b", "c"] {
            let j = job(name);
            tracker.track(j.clone()).unwrap();
            tracker.start(&j).unwrap();
            tracker.succeed(&j.id).unwrap();
        }
        let live = job("live");
        tracker.track(live.clone()).unwrap();

        assert!(tracker.get(&JobId::new("a").unwrap()).is_none());
        assert!(tracker.get(&JobId::new("b").unwrap()).is_some());
        assert!(tracker.get(&JobId::new("c").unwrap()).is_some());
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn resubmitted_id_is_not_pruned_while_live() {
        let tracker = JobTracker::with_finished_retention(1);
        let a = job("a");
        tracker.track(a.clone()).unwrap();
        tracker.start(&a).unwrap();
        tracker.fail(&a.id, "boom").unwrap();

        // Re-submitted and live again, then another job finishes.
        tracker.track(a.clone()).unwrap();
        let b = job("b");
        tracker.track(b.clone()).unwrap();
        tracker.start(&b).unwrap();
        tracker.succeed(&b.id).unwrap();
        let c = job("c");
        tracker.track(c.clone()).unwrap();
        tracker.start(&c).unwrap();
        tracker.succeed(&c.id).unwrap();

        assert_eq!(tracker.get(&a.id).unwrap().job.status, JobStatus::Queued);
        assert!(tracker.get(&b.id).is_none());
        assert!(tracker.get(&c.id).is_some());
    }

    #[test]
    fn list_is_sorted() {
        let tracker = JobTracker::new();
        for name in ["c", "a", "b"] {
            tracker.track(job(name)).unwrap();
        }
        let ids: Vec<String> = tracker.list().into_iter().map(|r| r.job.id.to_string()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
