use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pose_landmarks::config::Config;
use pose_landmarks::frames::FrameProcessor;
use pose_landmarks::pose::BlazePoseDetector;

const CONFIG_PATH: &str = "pose_landmarks.toml";

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("invalid log_level {:?}", level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn run() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH)?;
    init_logging(&config.log_level)?;
    info!("pose-landmarks ({})", env!("GIT_VERSION"));

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read standard input")?;

    let mut processor = FrameProcessor::new(|| BlazePoseDetector::new(&config));
    let output = processor.process_json(&input)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", output)?;
    stdout.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
