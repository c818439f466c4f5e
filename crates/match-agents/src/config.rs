//! Predictor configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, environment
//! variables, a TOML file, CLI flags (applied by the binary).
//!
//! ```toml
//! [weights]
//! statistician = 1.5
//! tactician = 1.0
//! sentiment_analyst = 0.8
//!
//! [llm]
//! url = "http://localhost:8080/v1"
//! model = "qwen2.5-14b-instruct"
//!
//! [engine]
//! rounds = 2
//! policy = "spread"
//!
//! [[agents]]
//! persona = "statistician"
//!
//! [[agents]]
//! persona = "news_analyst"
//! provider = "llm"
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use consensus::{AgentWeights, ConfidencePolicy};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentSpec, Provider};
use crate::engine::EngineOptions;

const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Text-generation endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Retries for transient failures.
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl LlmConfig {
    /// Build from an environment-like lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            url: get("MATCH_LLM_URL").unwrap_or_else(|| DEFAULT_LLM_URL.into()),
            model: get("MATCH_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
            api_key: get("MATCH_LLM_API_KEY")
                .or_else(|| get("OPENAI_API_KEY"))
                .filter(|k| !k.trim().is_empty()),
            timeout_secs: parse_or(get("MATCH_LLM_TIMEOUT_SECS"), 60),
            temperature: 0.2,
            max_tokens: 1500,
            max_retries: 2,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Debate and aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Debate rounds; 1 means independent analysis only.
    pub rounds: u32,
    pub min_agents: usize,
    /// Agents analysing at the same time.
    pub max_concurrency: usize,
    /// Per-agent time limit; `None` waits indefinitely.
    pub agent_timeout_secs: Option<u64>,
    pub policy: ConfidencePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl EngineConfig {
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rounds: parse_or(get("MATCH_DEBATE_ROUNDS"), 1).max(1),
            min_agents: 3,
            max_concurrency: 4,
            agent_timeout_secs: None,
            policy: ConfidencePolicy::default(),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    pub llm: LlmConfig,
    pub engine: EngineConfig,
    pub weights: AgentWeights,
    pub agents: Vec<AgentSpec>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            engine: EngineConfig::default(),
            weights: AgentWeights::standard(),
            agents: AgentSpec::standard_roster(),
        }
    }
}

/// On-disk shape; every field optional so a file can override a subset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    weights: Option<AgentWeights>,
    llm: Option<LlmFile>,
    engine: Option<EngineFile>,
    agents: Option<Vec<AgentSpec>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmFile {
    url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineFile {
    rounds: Option<u32>,
    min_agents: Option<usize>,
    max_concurrency: Option<usize>,
    agent_timeout_secs: Option<u64>,
    policy: Option<ConfidencePolicy>,
}

impl PredictorConfig {
    /// Defaults and environment, overlaid with a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;
        let mut config = Self::default();
        config
            .overlay_toml(&content)
            .context(format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Defaults and environment, overlaid with a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut config = Self::default();
        config.overlay_toml(toml_str)?;
        Ok(config)
    }

    /// Apply the values present in `toml_str`. File weights merge over the
    /// current table; a file roster replaces the current one.
    pub fn overlay_toml(&mut self, toml_str: &str) -> Result<()> {
        let file: ConfigFile =
            toml::from_str(toml_str).context("Failed to parse configuration TOML")?;

        if let Some(weights) = file.weights {
            self.weights.merge(&weights);
        }
        if let Some(llm) = file.llm {
            let target = &mut self.llm;
            if let Some(url) = llm.url {
                target.url = url;
            }
            if let Some(model) = llm.model {
                target.model = model;
            }
            if let Some(api_key) = llm.api_key {
                target.api_key = Some(api_key);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                target.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                target.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                target.max_tokens = max_tokens;
            }
            if let Some(max_retries) = llm.max_retries {
                target.max_retries = max_retries;
            }
        }
        if let Some(engine) = file.engine {
            let target = &mut self.engine;
            if let Some(rounds) = engine.rounds {
                target.rounds = rounds.max(1);
            }
            if let Some(min_agents) = engine.min_agents {
                target.min_agents = min_agents;
            }
            if let Some(max_concurrency) = engine.max_concurrency {
                target.max_concurrency = max_concurrency.max(1);
            }
            if engine.agent_timeout_secs.is_some() {
                target.agent_timeout_secs = engine.agent_timeout_secs;
            }
            if let Some(policy) = engine.policy {
                target.policy = policy;
            }
        }
        if let Some(agents) = file.agents {
            self.agents = agents;
        }
        Ok(())
    }

    /// Route every roster entry through the LLM.
    pub fn use_llm(&mut self) {
        for spec in &mut self.agents {
            spec.provider = Provider::Llm;
        }
    }

    /// Whether any roster entry needs a text generator.
    pub fn needs_llm(&self) -> bool {
        self.agents.iter().any(|s| s.provider == Provider::Llm)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            rounds: self.engine.rounds,
            min_agents: self.engine.min_agents,
            max_concurrency: self.engine.max_concurrency,
            agent_timeout: self.engine.agent_timeout_secs.map(Duration::from_secs),
        }
    }
}
