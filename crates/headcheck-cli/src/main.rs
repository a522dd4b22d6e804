use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use headcheck_session::Config;
use tracing_subscriber::EnvFilter;

mod offset;
mod replay;

#[derive(Parser)]
#[command(name = "headcheck", version, about = "Guided head-turn liveness check")]
struct Cli {
    /// TOML config file. HEADCHECK_* environment variables take precedence.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a session from a recorded detection trace
    Replay {
        /// JSON trace: {"width", "height", "detections": [landmarks | null | {"error"}]}
        trace: PathBuf,
        /// Image served as the camera frame (default: blank frame of the trace size)
        #[arg(long)]
        image: Option<PathBuf>,
        /// Where to write the captured PNG
        #[arg(long)]
        out: Option<PathBuf>,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Print the orientation offset of a landmark set
    Offset {
        /// JSON landmarks: {"points": [[x, y]; 68]} or {"nose", "left_eye", "right_eye"}
        landmarks: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::from_file(p).with_context(|| format!("loading {}", p.display())),
        None => Config::from_env().context("loading configuration from environment"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Replay {
            trace,
            image,
            out,
            timeout_secs,
        } => {
            replay::run(
                &config,
                replay::ReplayArgs {
                    trace,
                    image,
                    out,
                    timeout: Duration::from_secs(timeout_secs),
                },
            )
            .await
        }
        Command::Offset { landmarks } => offset::run(&config, &landmarks),
    }
}
