//! On-disk artifact layout.
//!
//! ```text
//! <output_root>/<job_id>/<rung>/index.m3u8
//! <output_root>/<job_id>/<rung>/segment000.ts, segment001.ts, ...
//! <output_root>/<job_id>/<rung>/<rung>.mp4
//! ```

use std::path::{Path, PathBuf};

use lf_core::{JobId, Rung};

pub const MANIFEST_NAME: &str = "index.m3u8";
pub const SEGMENT_PATTERN: &str = "segment%03d.ts";
pub const PROGRESSIVE_EXT: &str = "mp4";

/// Directory owned by one job.
pub fn job_dir(output_root: &Path, job_id: &JobId) -> PathBuf {
    output_root.join(job_id.as_str())
}

/// Directory holding one rung's artifacts.
pub fn rung_dir(output_root: &Path, job_id: &JobId, rung: &Rung) -> PathBuf {
    job_dir(output_root, job_id).join(&rung.label)
}

pub fn manifest_path(rung_dir: &Path) -> PathBuf {
    rung_dir.join(MANIFEST_NAME)
}

/// The ffmpeg `-hls_segment_filename` pattern.
pub fn segment_pattern(rung_dir: &Path) -> PathBuf {
    rung_dir.join(SEGMENT_PATTERN)
}

pub fn progressive_path(rung_dir: &Path, rung: &Rung) -> PathBuf {
    rung_dir.join(format!("{}.{PROGRESSIVE_EXT}", rung.label))
}
