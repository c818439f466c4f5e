//! Static per-agent reliability weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Weight applied to an agent with no entry in the table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Validated `agent_id -> weight` table.
///
/// Weights must be finite and non-negative. A zero weight mutes an agent
/// without removing it from the debate summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct AgentWeights {
    weights: BTreeMap<String, f64>,
}

impl AgentWeights {
    /// Build a table, rejecting invalid entries.
    pub fn new<I, K>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut weights = BTreeMap::new();
        for (agent, weight) in entries {
            let agent = agent.into();
            if agent.trim().is_empty() {
                return Err(ConfigError::EmptyAgentId);
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { agent, weight });
            }
            weights.insert(agent, weight);
        }
        Ok(Self { weights })
    }

    /// Empty table: every agent gets [`DEFAULT_WEIGHT`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard three-agent roster: hard data trusted most, narrative least.
    pub fn standard() -> Self {
        let weights = [
            ("statistician", 1.5),
            ("tactician", 1.0),
            ("sentiment_analyst", 0.8),
        ]
        .into_iter()
        .map(|(agent, weight)| (agent.to_string(), weight))
        .collect();
        Self { weights }
    }

    /// Parse the `[weights]` table of a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct WeightsFile {
            #[serde(default)]
            weights: AgentWeights,
        }
        let file: WeightsFile = toml::from_str(toml_str)?;
        Ok(file.weights)
    }

    /// Weight for an agent, defaulting to [`DEFAULT_WEIGHT`].
    pub fn weight_for(&self, agent_id: &str) -> f64 {
        self.configured(agent_id).unwrap_or(DEFAULT_WEIGHT)
    }

    /// Explicitly configured weight, if any.
    pub fn configured(&self, agent_id: &str) -> Option<f64> {
        self.weights.get(agent_id).copied()
    }

    /// Insert or replace a weight.
    pub fn set(&mut self, agent_id: impl Into<String>, weight: f64) -> Result<(), ConfigError> {
        let merged = Self::new([(agent_id.into(), weight)])?;
        self.weights.extend(merged.weights);
        Ok(())
    }

    /// Overlay another table on top of this one.
    pub fn merge(&mut self, other: &AgentWeights) {
        self.weights
            .extend(other.weights.iter().map(|(k, v)| (k.clone(), *v)));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl TryFrom<BTreeMap<String, f64>> for AgentWeights {
    type Error = ConfigError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::new(map)
    }
}

impl From<AgentWeights> for BTreeMap<String, f64> {
    fn from(weights: AgentWeights) -> Self {
        weights.weights
    }
}
