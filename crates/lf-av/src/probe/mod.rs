//! Source media probing.
//!
//! A [`Prober`] reports the intrinsic dimensions of a source's first video
//! stream. [`FfprobeProber`] is the production backend.

use std::path::Path;

use async_trait::async_trait;
use lf_core::SourceDimensions;

pub mod ffprobe;

pub use self::ffprobe::FfprobeProber;

/// Reads source dimensions from a media file.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe the file at `path`.
    ///
    /// Fails with [`lf_core::Error::Probe`] when the tool exits non-zero,
    /// its output cannot be parsed, or the file has no video stream.
    async fn probe(&self, path: &Path) -> lf_core::Result<SourceDimensions>;
}
