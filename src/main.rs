mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use lf_av::{FfmpegTranscoder, FfprobeProber, Prober, ToolRegistry};
use lf_core::config::Config;
use lf_core::Job;
use lf_orchestrator::JobOutcome;
use lf_server::context::AppContext;
use lf_server::routes::upload::{stored_file_name, upload_path};

const CRATES: &[&str] = &[
    "ladderforge",
    "lf_core",
    "lf_av",
    "lf_queue",
    "lf_orchestrator",
    "lf_server",
];

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = if cli.verbose { "debug" } else { "info" };
        let mut directives: Vec<String> =
            CRATES.iter().map(|c| format!("{c}={level}")).collect();
        directives.push(format!("tower_http={level}"));
        directives.join(",")
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start {
            host,
            port,
            concurrency,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(n) = concurrency {
                config.worker.concurrency = n;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(config))
        }
        Commands::Run { input } => {
            let config = load_config(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_file(&input, config))
        }
        Commands::Probe { file, json } => {
            let config = load_config(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, &config))
        }
        Commands::Plan { file } => {
            let config = load_config(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(plan_file(&file, &config))
        }
        Commands::CheckTools => {
            let config = load_config(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("ladderforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Strict load when a path is given, defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) if p.exists() => Ok(Config::load(p)?),
        other => Ok(Config::load_or_default(other)),
    }
}

async fn start_server(config: Config) -> Result<()> {
    tracing::info!(
        "Starting ladderforge on {}:{} with {} workers",
        config.server.host,
        config.server.port,
        config.worker.concurrency
    );
    lf_server::start(config).await?;
    Ok(())
}

fn prober(tools: &ToolRegistry) -> Result<FfprobeProber> {
    Ok(FfprobeProber::from_registry(tools)?)
}

async fn run_file(input: &Path, config: Config) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    config.check()?;
    lf_server::ensure_storage_dirs(&config.storage)?;

    let tools = Arc::new(lf_server::discover_tools(&config));
    let prober = Arc::new(prober(&tools)?);
    let transcoder = Arc::new(FfmpegTranscoder::from_registry(
        &tools,
        config.transcode.clone(),
    )?);

    // Stage the input the way the gateway stores uploads; the job owns the copy.
    let original = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let staged = upload_path(
        &config.storage.upload_dir,
        &stored_file_name(chrono::Utc::now().timestamp_millis(), original),
    );
    tokio::fs::copy(input, &staged).await?;
    tracing::info!("Staged {:?} as {:?}", input, staged);

    let ctx = AppContext::new(config, tools);
    let job = Job::from_source(&staged)?;
    let job_id = job.id.clone();
    lf_orchestrator::submit(ctx.queue.as_ref(), &ctx.tracker, &ctx.event_bus, job).await?;

    let pool = ctx.worker_pool(prober, transcoder);
    match pool.run_next().await? {
        JobOutcome::Succeeded { artifacts } => {
            println!("Job {job_id} succeeded");
            if artifacts.is_empty() {
                println!("  (ladder empty; no renditions produced)");
            }
            for a in &artifacts {
                println!("  {}", a.rung);
                println!("    progressive: {}", a.progressive.display());
                println!("    manifest:    {}", a.manifest.display());
            }
            Ok(())
        }
        JobOutcome::Failed { reason } => {
            anyhow::bail!("Job {job_id} failed: {reason} (source kept at {:?})", staged)
        }
    }
}

async fn probe_file(file: &Path, json: bool, config: &Config) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let dims = prober(&tools)?.probe(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dims)?);
    } else {
        println!("File: {}", file.display());
        println!("Video: {dims}");
    }
    Ok(())
}

async fn plan_file(file: &Path, config: &Config) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let dims = prober(&tools)?.probe(file).await?;
    let ladder = config.ladder.plan(dims);

    println!("Source: {dims}");
    if ladder.is_empty() {
        println!("Ladder: empty (source is taller than every rung)");
    } else {
        println!("Ladder:");
        for rung in &ladder {
            println!("  {rung}");
        }
    }
    let skipped = config.ladder.len() - ladder.len();
    if skipped > 0 {
        println!("Skipped {skipped} rung(s) shorter than the source");
    }
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg and ffprobe are both required")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Uploads: {}", config.storage.upload_dir.display());
    println!("  Output: {}", config.storage.output_dir.display());
    println!("  Workers: {}", config.worker.concurrency);
    println!("  Ladder: {} rung(s)", config.ladder.len());
    for rung in config.ladder.rungs() {
        println!("    {rung}");
    }

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
