//! Error types for the consensus core.
//!
//! Only construction-time problems are errors. Aggregation and rendering
//! never fail: missing fields and degenerate rosters are recovered locally.

use thiserror::Error;

/// Invalid static configuration (weights tables).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid weight for agent '{agent}': {weight} (must be finite and >= 0)")]
    InvalidWeight { agent: String, weight: f64 },

    #[error("Agent id in weights table must not be empty")]
    EmptyAgentId,

    #[error("Weights TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Invalid match context record.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("{side} team name must not be empty")]
    EmptyTeamName { side: &'static str },

    #[error("Match context JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
