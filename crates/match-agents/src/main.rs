//! Match prediction CLI.
//!
//! ```bash
//! # Rule-based roster, text report
//! match-agents --context fixtures/city_west_ham.json
//!
//! # Every persona through the LLM endpoint, two rounds, JSON body
//! MATCH_LLM_URL=http://localhost:8080/v1 match-agents --context - --llm --rounds 2 --format json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use consensus::{ConfidencePolicy, MatchContext};
use match_agents::{AgentFactory, ChatCompletionsClient, ConsensusEngine, PredictorConfig};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Match context JSON file, or `-` for stdin
    #[arg(long)]
    context: PathBuf,

    /// TOML configuration overlay
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Debate rounds (overrides MATCH_DEBATE_ROUNDS)
    #[arg(long)]
    rounds: Option<u32>,

    /// Route every persona through the LLM endpoint
    #[arg(long, default_value_t = false)]
    llm: bool,

    /// Confidence policy: spread or self-reported
    #[arg(long)]
    policy: Option<ConfidencePolicy>,
}

fn read_context(path: &Path) -> Result<MatchContext> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read match context from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?
    };
    MatchContext::from_json(&json).context("Invalid match context")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => PredictorConfig::load(path)?,
        None => PredictorConfig::default(),
    };
    if let Some(rounds) = args.rounds {
        config.engine.rounds = rounds.max(1);
    }
    if let Some(policy) = args.policy {
        config.engine.policy = policy;
    }
    if args.llm {
        config.use_llm();
    }

    let factory = if config.needs_llm() {
        let client = ChatCompletionsClient::from_config(&config.llm)?;
        info!(endpoint = %client.endpoint(), model = %client.model(), "Using LLM endpoint");
        AgentFactory::with_generator(Arc::new(client))
    } else {
        AgentFactory::deterministic()
    };

    let engine = ConsensusEngine::from_config(&config, &factory)?;
    let context = read_context(&args.context)?;
    info!(
        fixture = %context.fixture(),
        agents = ?engine.agent_ids(),
        "Match predictor starting"
    );

    let response = engine.run(&context).await;
    match args.format {
        OutputFormat::Text => println!("{}", response.debate_summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    Ok(())
}
