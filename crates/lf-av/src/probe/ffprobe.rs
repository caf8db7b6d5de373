//! FFprobe-based [`Prober`] implementation.
//!
//! Shells out to
//! `ffprobe -v error -select_streams v:0 -show_entries stream=width,height -of json`
//! and reads the dimensions of the first video stream.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use lf_core::{Error, SourceDimensions};

use super::Prober;
use crate::tools::{ToolConfig, ToolRegistry};

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: ToolConfig,
}

impl FfprobeProber {
    pub fn new(ffprobe: ToolConfig) -> Self {
        Self { ffprobe }
    }

    /// Create a prober from a registry that has discovered ffprobe.
    pub fn from_registry(tools: &ToolRegistry) -> lf_core::Result<Self> {
        Ok(Self::new(tools.require("ffprobe")?.clone()))
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> lf_core::Result<SourceDimensions> {
        let mut cmd = self.ffprobe.command();
        cmd.args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height",
            "-of", "json",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute().await.map_err(|e| match e {
            Error::Tool { message, .. } => {
                Error::Probe(format!("ffprobe failed for {}: {message}", path.display()))
            }
            other => other,
        })?;

        let dims = parse_ffprobe_output(&output.stdout)
            .map_err(|e| Error::Probe(format!("{}: {e}", path.display())))?;
        tracing::debug!("Probed {}: {dims}", path.display());
        Ok(dims)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse ffprobe JSON into the first video stream's dimensions.
pub fn parse_ffprobe_output(json: &str) -> Result<SourceDimensions, String> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("ffprobe JSON parse error: {e}"))?;

    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Ok(SourceDimensions::new(w, h)),
        (w, h) => Err(format!("video stream has no usable dimensions ({w:?}x{h:?})")),
    }
}
