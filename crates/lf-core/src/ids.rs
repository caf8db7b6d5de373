//! Job identifiers.
//!
//! A [`JobId`] is derived from the stored source file's name (its stem), so it
//! is a validated string rather than a UUID. The id names the job's output
//! directory, so it must be a single, non-traversing path component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Unique identifier for a transcoding job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Validate and wrap a job id.
    ///
    /// Rejects empty ids, `.`/`..`, and anything containing a path separator
    /// or NUL byte.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id == "." || id == ".." {
            return Err(Error::Validation(format!("invalid job id: {id:?}")));
        }
        if id.contains(['/', '\\', '\0']) {
            return Err(Error::Validation(format!(
                "job id must be a single path component: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Derive the id from a source file path: the file name without its
    /// final extension.
    pub fn from_source_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "cannot derive job id from {}",
                    path.display()
                ))
            })?;
        Self::new(stem)
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for JobId {
    type Error = Error;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
