//! The transcoding job and its state machine.
//!
//! ```text
//! Queued ──start──▶ Running ──succeed──▶ Succeeded
//!                      │
//!                      └──────fail──────▶ Failed
//! ```
//!
//! `Succeeded` and `Failed` are terminal; any further transition is refused.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ids::JobId;

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to transcode one uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub source_path: PathBuf,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Job {
    /// Create a queued job for the given source file.
    pub fn new(id: JobId, source_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            source_path: source_path.into(),
            status: JobStatus::Queued,
            failure_reason: None,
        }
    }

    /// Create a queued job whose id is derived from the source file stem.
    pub fn from_source(source_path: impl Into<PathBuf>) -> Result<Self> {
        let source_path = source_path.into();
        let id = JobId::from_source_path(&source_path)?;
        Ok(Self::new(id, source_path))
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// `Queued -> Running`.
    pub fn start(&mut self) -> Result<()> {
        self.transition(JobStatus::Running)
    }

    /// `Running -> Succeeded`.
    pub fn succeed(&mut self) -> Result<()> {
        self.transition(JobStatus::Succeeded)
    }

    /// `Running -> Failed`, recording the reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(JobStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        );
        if !allowed {
            return Err(Error::Conflict(format!(
                "job {}: illegal transition {} -> {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}
