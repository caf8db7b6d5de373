//! Per-rung transcoding.
//!
//! A [`RungTranscoder`] turns one source into the artifact pair for one rung:
//! a progressive MP4 and an HLS manifest with its segments, both scaled to the
//! rung's target dimensions. [`FfmpegTranscoder`] is the production backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lf_core::Rung;

pub mod ffmpeg;
pub mod layout;

pub use self::ffmpeg::FfmpegTranscoder;

/// Files produced for one rung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub rung: Rung,
    /// Rung-scoped directory holding everything below.
    pub dir: PathBuf,
    pub progressive: PathBuf,
    /// HLS playlist; segments sit beside it.
    pub manifest: PathBuf,
}

impl Artifacts {
    /// Artifact paths for `rung` under `dir`, per [`layout`].
    pub fn for_rung(dir: &Path, rung: &Rung) -> Self {
        Self {
            rung: rung.clone(),
            dir: dir.to_path_buf(),
            progressive: layout::progressive_path(dir, rung),
            manifest: layout::manifest_path(dir),
        }
    }
}

/// Produces the artifact pair for a single rung.
#[async_trait]
pub trait RungTranscoder: Send + Sync {
    /// Transcode `source` into `output_dir` at the rung's dimensions.
    ///
    /// The directory is created if missing. The progressive file is written
    /// first; the manifest is not attempted if that fails. Partial output is
    /// left in place on failure.
    async fn transcode(
        &self,
        source: &Path,
        output_dir: &Path,
        rung: &Rung,
    ) -> lf_core::Result<Artifacts>;
}
