//! CLI module for Maestro
//!
//! - `hook`: speak the host hook protocol over stdin/stdout (default)
//! - `classify`: print ranked intents for a prompt
//! - `plan`: print the routing decision and plan outline for a prompt

use crate::config::{load_config, AppConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maestro_core::{DelegatingHost, Mode, Orchestrator};
use maestro_skills::StaticCatalog;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Maestro prompt orchestration CLI
#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(about = "Prompt orchestration hook for agent hosts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read hook events (one JSON object per line) from stdin (default)
    Hook,
    /// Classify a prompt and print the ranked intents
    Classify {
        /// Prompt text
        text: String,
    },
    /// Show the routing decision for a prompt
    Plan {
        /// Prompt text
        text: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let orchestrator = build_orchestrator(config)?;

    match cli.command.unwrap_or(Commands::Hook) {
        Commands::Hook => run_hook(&orchestrator).await,
        Commands::Classify { text } => {
            let intents = orchestrator.classify(&text);
            let out = json!({
                "threshold": orchestrator.current_threshold(),
                "intents": intents,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Commands::Plan { text } => {
            let intents = orchestrator.classify(&text);
            let threshold = orchestrator.current_threshold();
            let decision = orchestrator
                .detector()
                .decide(&intents, threshold)
                .context("Failed to build plan")?;
            let out = match &decision.mode {
                Mode::Single(intent) => json!({
                    "mode": decision.mode.kind(),
                    "category": intent.category(),
                    "confidence": intent.confidence(),
                }),
                Mode::Pipeline(plan) => json!({
                    "mode": decision.mode.kind(),
                    "lowConfidence": decision.low_confidence,
                    "template": plan.template(),
                    "outline": plan.outline(),
                    "steps": plan.steps(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

fn build_orchestrator(config: AppConfig) -> Result<Orchestrator> {
    let mut catalog = StaticCatalog::with_defaults();
    catalog.extend(config.catalog);

    Orchestrator::new(
        config.orchestrator,
        Arc::new(catalog),
        Arc::new(DelegatingHost),
    )
    .context("Failed to initialize orchestrator")
}

/// One decision line per event line; idle sessions are evicted after `sessions.idle_ttl_secs`
async fn run_hook(orchestrator: &Orchestrator) -> Result<()> {
    info!("Maestro hook v{} reading events from stdin", env!("CARGO_PKG_VERSION"));
    let logger = orchestrator.events().spawn_logger();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let output = orchestrator.handle_raw(&line).await;
        debug!(continue_turn = output.continue_turn, "Hook decision");

        let mut encoded = serde_json::to_vec(&output).context("Failed to encode hook output")?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }
    logger.abort();
    Ok(())
}
