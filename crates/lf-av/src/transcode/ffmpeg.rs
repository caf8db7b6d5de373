//! ffmpeg-backed [`RungTranscoder`].
//!
//! Each rung takes two ffmpeg runs over the source with the same `scale`
//! filter: first a progressive MP4 with `+faststart`, then a VOD HLS playlist
//! with MPEG-TS segments.

use std::path::Path;

use async_trait::async_trait;

use lf_core::config::TranscodeConfig;
use lf_core::Rung;

use super::{layout, Artifacts, RungTranscoder};
use crate::command::ToolCommand;
use crate::tools::{ToolConfig, ToolRegistry};

/// Transcodes rungs by shelling out to `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: ToolConfig,
    settings: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg: ToolConfig, settings: TranscodeConfig) -> Self {
        Self { ffmpeg, settings }
    }

    /// Create a transcoder from a registry that has discovered ffmpeg.
    pub fn from_registry(tools: &ToolRegistry, settings: TranscodeConfig) -> lf_core::Result<Self> {
        Ok(Self::new(tools.require("ffmpeg")?.clone(), settings))
    }

    /// Build the progressive MP4 invocation.
    pub fn progressive_command(&self, source: &Path, artifacts: &Artifacts) -> ToolCommand {
        let mut cmd = self.ffmpeg.command();
        self.push_common(&mut cmd, source, &artifacts.rung);
        cmd.args(["-movflags", "+faststart"]);
        cmd.arg(artifacts.progressive.to_string_lossy().as_ref());
        cmd
    }

    /// Build the HLS manifest + segments invocation.
    pub fn hls_command(&self, source: &Path, artifacts: &Artifacts) -> ToolCommand {
        let mut cmd = self.ffmpeg.command();
        self.push_common(&mut cmd, source, &artifacts.rung);
        cmd.args(["-hls_time", &self.settings.segment_duration_secs.to_string()]);
        cmd.args(["-hls_playlist_type", "vod"]);
        cmd.args([
            "-hls_segment_filename",
            &layout::segment_pattern(&artifacts.dir).to_string_lossy(),
        ]);
        cmd.args(["-start_number", "0"]);
        cmd.args(["-f", "hls"]);
        cmd.arg(artifacts.manifest.to_string_lossy().as_ref());
        cmd
    }

    /// Input, scaling, and codec arguments shared by both runs.
    fn push_common(&self, cmd: &mut ToolCommand, source: &Path, rung: &Rung) {
        let s = &self.settings;
        cmd.args(["-y", "-nostdin", "-i"]);
        cmd.arg(source.to_string_lossy().as_ref());
        cmd.args(["-vf", &scale_filter(rung)]);
        cmd.args(["-c:v", &s.video_codec, "-preset", &s.video_preset]);
        match &s.video_bitrate {
            Some(bitrate) => cmd.args(["-b:v", bitrate.as_str()]),
            None => cmd.args(["-crf", &s.video_crf.to_string()]),
        };
        cmd.args(["-c:a", &s.audio_codec, "-b:a", &s.audio_bitrate]);
    }
}

/// The `-vf` filter for a rung. Width and height are applied literally.
pub fn scale_filter(rung: &Rung) -> String {
    format!("scale={}:{}", rung.width, rung.height)
}

#[async_trait]
impl RungTranscoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        output_dir: &Path,
        rung: &Rung,
    ) -> lf_core::Result<Artifacts> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| lf_core::Error::storage(output_dir, e))?;

        let artifacts = Artifacts::for_rung(output_dir, rung);

        tracing::info!(
            "Progressive: {:?} -> {:?} ({}x{})",
            source,
            artifacts.progressive,
            rung.width,
            rung.height
        );
        self.progressive_command(source, &artifacts).execute().await?;

        tracing::info!(
            "HLS: {:?} -> {:?} (segment_duration={}s)",
            source,
            artifacts.manifest,
            self.settings.segment_duration_secs
        );
        self.hls_command(source, &artifacts).execute().await?;

        Ok(artifacts)
    }
}
