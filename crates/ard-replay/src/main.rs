//! Replay a recorded architect-reviewer debate and write its design document.
//!
//! # Usage
//!
//! ```bash
//! # Replay with default settings
//! ard-replay transcripts/offline_sync.json
//!
//! # Custom configuration and output
//! ard-replay transcripts/offline_sync.json --config debate.toml -o out/design.md
//!
//! # Environment overrides
//! ARD_MAX_ITERATIONS=3 RUST_LOG=debug ard-replay transcripts/offline_sync.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ard_coordination::{DebateConfig, DocumentEmitter, MarkdownEmitter};
use ard_replay::{replay, ReplayStatus, Transcript};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded transcript (JSON)
    transcript: PathBuf,

    /// Debate configuration (TOML); ARD_* environment variables still apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the design document
    #[arg(short, long, default_value = "output/design.md")]
    output: PathBuf,

    /// Maximum rounds (overrides config and ARD_MAX_ITERATIONS)
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Disable the human decision gate
    #[arg(long, default_value_t = false)]
    no_hitl: bool,

    /// Also write the final session record as JSON
    #[arg(long)]
    session_json: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<DebateConfig> {
    let mut config = match &args.config {
        Some(path) => DebateConfig::load(path)?,
        None => {
            let mut config = DebateConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    if let Some(max) = args.max_iterations {
        config.max_iterations = max;
    }
    if args.no_hitl {
        config.hitl_enabled = false;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args).context("failed to load debate configuration")?;
    info!(
        architect = %config.architect_model,
        reviewer = %config.reviewer_model,
        max_iterations = config.max_iterations,
        hitl_enabled = config.hitl_enabled,
        "ard-replay starting"
    );

    let transcript = Transcript::load(&args.transcript)?;
    let report = replay(config, transcript).await?;

    if let Some(path) = &args.session_json {
        let json = serde_json::to_string_pretty(&report.session)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write session record {}", path.display()))?;
    }

    match report.status {
        ReplayStatus::Completed => {
            let path = MarkdownEmitter
                .write_document(&report.session, &args.output)
                .context("failed to write design document")?;
            info!(
                status = %report.session.status(),
                rounds = report.session.iteration(),
                path = %path.display(),
                "Replay complete"
            );
        }
        ReplayStatus::Suspended {
            round,
            challenge_id,
        } => {
            warn!(
                round,
                challenge_id,
                "Transcript ends at an unanswered human decision; no document written"
            );
        }
    }

    println!("{}", report.session.status_line());
    Ok(())
}
