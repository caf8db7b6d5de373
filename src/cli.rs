use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ladderforge")]
#[command(author, version, about = "Adaptive bitrate ladder transcoding service")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the upload gateway and worker pool
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Number of concurrent jobs (overrides config)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// Transcode a single file through the full ladder
    Run {
        /// Input video; it is copied into the upload directory first
        #[arg(required = true)]
        input: PathBuf,
    },

    /// Probe a video file and print its dimensions
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe a video file and print the ladder that would be produced
    Plan {
        /// File to plan for
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Check that ffmpeg and ffprobe are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config or defaults if not given)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
