//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, storage layout, worker pool, external tools,
//! encoder parameters, and the rung catalog. Every section defaults sensibly
//! so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::ladder::Catalog;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub worker: WorkerConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
    /// Rung catalog, ascending by height.
    pub ladder: Catalog,
}

impl Config {
    /// Deserialize a `Config` from a JSON string and reject hard errors.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a file, failing on read or parse errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Reject settings the service cannot run with.
    ///
    /// The catalog is validated on deserialization; this covers the scalar
    /// settings.
    pub fn check(&self) -> Result<()> {
        if self.worker.concurrency == 0 {
            return Err(Error::Validation(
                "worker.concurrency must be at least 1".into(),
            ));
        }
        if self.transcode.segment_duration_secs == 0 {
            return Err(Error::Validation(
                "transcode.segment_duration_secs must be at least 1".into(),
            ));
        }
        if self.tools.timeout_secs == 0 {
            return Err(Error::Validation(
                "tools.timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.ladder.is_empty() {
            warnings.push("ladder is empty; jobs will succeed without producing artifacts".into());
        }

        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name} {} does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        if self.storage.output_dir == self.storage.upload_dir {
            warnings.push(
                "storage.output_dir equals storage.upload_dir; artifacts and uploads will mix"
                    .into(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body for uploads.
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_upload_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}

/// Where uploads land and where artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    /// Base directory for `<output_dir>/<job_id>/<rung>/...`.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("uploads/videos"),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of jobs running at once.
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { concurrency: 2 }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Per-invocation limit; the process is killed when it expires.
    pub timeout_secs: u64,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            timeout_secs: 6 * 60 * 60,
        }
    }
}

/// Fixed encoder parameters applied to every rung.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub video_codec: String,
    pub video_preset: String,
    pub video_crf: u32,
    /// Target video bitrate (e.g. "2500k"). When set it replaces CRF.
    pub video_bitrate: Option<String>,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Target HLS segment length.
    pub segment_duration_secs: u32,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            video_preset: "veryfast".into(),
            video_crf: 23,
            video_bitrate: None,
            audio_codec: "aac".into(),
            audio_bitrate: "128k".into(),
            segment_duration_secs: 10,
        }
    }
}
