use std::path::PathBuf;

use clap::{Parser, Subcommand};
use paper_drum::{replay, PadSessionConfig, ReplayTrace};

#[cfg(not(feature = "tracing"))]
use std::str::FromStr;

#[cfg(not(feature = "tracing"))]
use log::{info, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::info;

#[cfg(feature = "tracing")]
use paper_drum::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use paper_drum::core::init_with_level;

#[derive(Debug, Parser)]
#[command(name = "paper-drum", version, about = "Replay fingertip traces against a paper drum sheet")]
struct Cli {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a recorded trace through a session and write a JSON report.
    Replay {
        /// Session config (JSON). Defaults to the six-pad acoustic kit.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Trace of frame / calibrate / resize events (JSON).
        #[arg(long)]
        trace: PathBuf,
        /// Report path; printed to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default session config to a file.
    InitConfig {
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    {
        let log_level = LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Info);
        init_with_level(log_level)?;
    }

    #[cfg(feature = "tracing")]
    init_tracing(false);

    match cli.command {
        Command::Replay {
            config,
            trace,
            output,
        } => run_replay(config, trace, output),
        Command::InitConfig { path } => {
            PadSessionConfig::default().write_json(&path)?;
            info!("wrote default config to {}", path.display());
            Ok(())
        }
    }
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info"))]
fn run_replay(
    config_path: Option<PathBuf>,
    trace_path: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match config_path.as_ref() {
        Some(path) => PadSessionConfig::load_json(path)?,
        None => PadSessionConfig::default(),
    };
    let mut session = cfg.build_session()?;
    let trace = ReplayTrace::load_json(&trace_path)?;
    info!("loaded {} trace events", trace.events.len());

    let mut report = replay(&mut session, &trace);
    report.config_path = config_path.map(|p| p.to_string_lossy().into_owned());
    report.trace_path = Some(trace_path.to_string_lossy().into_owned());

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            report.write_json(&path)?;
            info!("wrote report JSON to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
