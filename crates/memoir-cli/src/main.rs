//! memoir - command-line front end for the memory reconciliation pipeline.
//!
//! # Configuration
//!
//! Configuration is read from `--config FILE`, or `~/.memoir/config.toml`
//! when present, then overlaid with environment variables (a `.env` file in
//! the working directory is honored):
//!
//! - `MEMOIR_LLM_PROVIDER` - `deepinfra` (default) or `openai`
//! - `MEMOIR_LLM_MODEL` - model override
//! - `MEMOIR_LLM_BASE_URL` - endpoint override
//! - `DEEPINFRA_API_KEY` / `OPENAI_API_KEY` - provider key
//!
//! Logs go to stderr; `RUST_LOG` controls verbosity.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use memoir_core::types::ReconciliationResponse;
use memoir_core::{
    normalize_facts_to_json, normalize_reconciliation, parse_reconciliation, InMemoryStore,
    MemoirConfig, MemoryStore, Reconciler,
};
use memoir_llm::LlmFactory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "memoir")]
#[command(about = "Turn conversations into reconciled memories", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (.toml, .json, .yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw model output read from stdin (no LLM call)
    Normalize {
        /// Which response shape to expect
        #[arg(short, long, value_enum, default_value_t = ResponseKind::Facts)]
        kind: ResponseKind,

        /// Memory file used to enforce id invariants on reconciliation output
        #[arg(short, long)]
        memory: Option<PathBuf>,
    },
    /// Extract facts from conversation turns, one per line
    Extract {
        /// Conversation file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Extract facts, reconcile them against a memory file and save it
    Add {
        /// JSON memory file, created when missing
        #[arg(short, long)]
        memory: PathBuf,

        /// Conversation file (stdin when omitted)
        input: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ResponseKind {
    Facts,
    Memory,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize { kind, memory } => {
            let text = read_input(None)?;
            let output = match kind {
                ResponseKind::Facts => normalize_facts_to_json(&text),
                ResponseKind::Memory => {
                    let memory = match memory {
                        Some(path) => {
                            let store = InMemoryStore::load_json(&path).await?;
                            let snapshot = store.snapshot().await?;
                            normalize_reconciliation(&text, &snapshot)
                        }
                        None => parse_reconciliation(&text),
                    };
                    serde_json::to_string(&ReconciliationResponse { memory })?
                }
            };
            println!("{output}");
        }
        Commands::Extract { input } => {
            let turns = split_turns(&read_input(input.as_deref())?);
            let config = load_config(cli.config.as_deref())?;
            let reconciler = build_reconciler(&config)?;

            let facts = reconciler.extract_facts(&turns).await?;
            println!("{}", serde_json::to_string_pretty(&facts)?);
        }
        Commands::Add { memory, input } => {
            let turns = split_turns(&read_input(input.as_deref())?);
            let config = load_config(cli.config.as_deref())?;
            let reconciler = build_reconciler(&config)?;

            let store = InMemoryStore::load_json(&memory)
                .await
                .with_context(|| format!("Failed to load memory file {}", memory.display()))?;
            let (outcome, report) = reconciler.process_into(&turns, &store).await?;

            if report.changed() > 0 {
                store.save_json(&memory).await?;
            }
            tracing::info!(
                added = report.added,
                updated = report.updated,
                deleted = report.deleted,
                unchanged = report.unchanged,
                skipped = report.skipped,
                path = %memory.display(),
                "Applied memory decisions"
            );

            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Load the configuration file (explicit or default) and overlay the environment.
fn load_config(path: Option<&Path>) -> Result<MemoirConfig> {
    let mut config = match path {
        Some(path) => MemoirConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let default_path = MemoirConfig::default_path();
            if default_path.exists() {
                tracing::info!("Config file: {}", default_path.display());
                MemoirConfig::from_file(&default_path)?
            } else {
                MemoirConfig::default()
            }
        }
    };
    config.apply_env();
    Ok(config)
}

fn build_reconciler(config: &MemoirConfig) -> Result<Reconciler> {
    let llm = LlmFactory::from_config(config)?;
    tracing::info!(provider = ?config.llm.provider, model = llm.model_name(), "Using LLM");
    Ok(Reconciler::from_config(llm, config))
}

/// Read a file or stdin. Invalid UTF-8 is replaced rather than rejected.
fn read_input(path: Option<&Path>) -> Result<String> {
    let bytes = match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// One conversation turn per non-blank line.
fn split_turns(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
