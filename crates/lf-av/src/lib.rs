//! # lf-av
//!
//! External tool management, probing, and per-rung transcoding for the
//! ladderforge orchestrator.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with a timeout
//!   that kills the child process when it expires.
//! - **Probing** ([`probe::Prober`], [`probe::FfprobeProber`]) -- read the
//!   dimensions of a source's first video stream.
//! - **Transcoding** ([`transcode::RungTranscoder`],
//!   [`transcode::FfmpegTranscoder`]) -- produce the progressive MP4 and the
//!   HLS manifest plus segments for one rung.

pub mod command;
pub mod probe;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::{FfprobeProber, Prober};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use transcode::{Artifacts, FfmpegTranscoder, RungTranscoder};
