//! Match Agents
//!
//! Analyst agents and the debate engine that feeds the `consensus` crate:
//! - Rule-based statistician, tactician and sentiment analyst
//! - Prompted agents for any persona over an OpenAI-compatible endpoint
//! - Concurrent debate rounds with peer summaries and revision blending
//! - Layered configuration from environment, TOML and CLI
//!
//! # Usage
//!
//! ```no_run
//! use consensus::MatchContext;
//! use match_agents::{AgentFactory, ConsensusEngine, PredictorConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = PredictorConfig::default();
//! let engine = ConsensusEngine::from_config(&config, &AgentFactory::deterministic())?;
//! let context = MatchContext::new("Manchester City", "West Ham")?;
//! let response = engine.run(&context).await;
//! println!("{}", response.debate_summary);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod agents;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod persona;

pub use agents::{Agent, AgentFactory, AgentSpec, LlmAgent, Provider};
pub use client::{ChatCompletionsClient, TextGenerator};
pub use config::{EngineConfig, LlmConfig, PredictorConfig};
pub use engine::{ConsensusEngine, EngineOptions};
pub use error::{ClientError, EngineError};
pub use persona::Persona;
