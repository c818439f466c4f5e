//! Prediction agents.
//!
//! Every agent turns a [`MatchContext`] into one [`AgentResult`]. Rule-based
//! agents cover the three standard personas; [`LlmAgent`] covers any persona
//! given a [`TextGenerator`]. The [`AgentFactory`] builds a roster from
//! configuration.

pub mod llm;
pub mod sentiment;
pub mod statistician;
pub mod tactician;

use std::sync::Arc;

use async_trait::async_trait;
use consensus::{round_to, AgentResult, MatchContext, Probabilities};
use serde::{Deserialize, Serialize};

use crate::client::TextGenerator;
use crate::error::EngineError;
use crate::persona::Persona;

pub use llm::LlmAgent;
pub use sentiment::SentimentAgent;
pub use statistician::StatisticianAgent;
pub use tactician::TacticianAgent;

/// A single analyst in the debate.
///
/// `analyze` never fails: implementations report their own failures as
/// [`AgentResult::neutral`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Id matched against the weights table.
    fn id(&self) -> &str;

    async fn analyze(&self, context: &MatchContext) -> AgentResult;
}

/// How a persona produces its prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Rule-based, no network.
    #[default]
    Deterministic,
    /// Prompted text generation.
    Llm,
}

/// One roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub persona: Persona,
    #[serde(default)]
    pub provider: Provider,
}

impl AgentSpec {
    pub fn new(persona: Persona, provider: Provider) -> Self {
        Self { persona, provider }
    }

    pub fn deterministic(persona: Persona) -> Self {
        Self::new(persona, Provider::Deterministic)
    }

    pub fn llm(persona: Persona) -> Self {
        Self::new(persona, Provider::Llm)
    }

    /// Statistician, tactician and sentiment analyst, all rule-based.
    pub fn standard_roster() -> Vec<Self> {
        [
            Persona::Statistician,
            Persona::Tactician,
            Persona::SentimentAnalyst,
        ]
        .into_iter()
        .map(Self::deterministic)
        .collect()
    }
}

/// Builds agents from roster entries.
#[derive(Clone, Default)]
pub struct AgentFactory {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AgentFactory {
    /// Factory for rule-based agents only.
    pub fn deterministic() -> Self {
        Self::default()
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub fn build(&self, spec: &AgentSpec) -> Result<Arc<dyn Agent>, EngineError> {
        let persona = spec.persona;
        match spec.provider {
            Provider::Deterministic => match persona {
                Persona::Statistician => Ok(Arc::new(StatisticianAgent::new())),
                Persona::Tactician => Ok(Arc::new(TacticianAgent::new())),
                Persona::SentimentAnalyst => Ok(Arc::new(SentimentAgent::new())),
                Persona::NewsAnalyst | Persona::RiskAssessor => {
                    Err(EngineError::NoDeterministicAgent { persona })
                }
            },
            Provider::Llm => {
                let generator = self
                    .generator
                    .clone()
                    .ok_or(EngineError::GeneratorRequired { persona })?;
                Ok(Arc::new(LlmAgent::new(persona, generator)))
            }
        }
    }

    pub fn build_roster(&self, specs: &[AgentSpec]) -> Result<Vec<Arc<dyn Agent>>, EngineError> {
        specs.iter().map(|spec| self.build(spec)).collect()
    }
}

/// Finish a home-win estimate with a fixed draw: round both to cents and
/// give the away side the remainder.
pub(crate) fn with_remainder(home: f64, draw: f64) -> Probabilities {
    let home = round_to(home.clamp(0.0, 1.0), 2);
    let draw = round_to(draw.clamp(0.0, 1.0 - home), 2);
    Probabilities::new(home, draw, round_to((1.0 - home - draw).max(0.0), 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_roster_ids_match_weights() {
        let roster = AgentFactory::deterministic()
            .build_roster(&AgentSpec::standard_roster())
            .unwrap();
        let ids: Vec<_> = roster.iter().map(|a| a.id().to_string()).collect();
        assert_eq!(ids, vec!["statistician", "tactician", "sentiment_analyst"]);
        let weights = consensus::AgentWeights::standard();
        for id in &ids {
            assert!(weights.configured(id).is_some(), "{id} has no weight");
        }
    }

    #[test]
    fn test_deterministic_only_personas_rejected() {
        let factory = AgentFactory::deterministic();
        assert!(matches!(
            factory.build(&AgentSpec::deterministic(Persona::NewsAnalyst)),
            Err(EngineError::NoDeterministicAgent { .. })
        ));
        assert!(matches!(
            factory.build(&AgentSpec::llm(Persona::Tactician)),
            Err(EngineError::GeneratorRequired { .. })
        ));
    }

    #[test]
    fn test_spec_from_toml() {
        #[derive(Deserialize)]
        struct Roster {
            agents: Vec<AgentSpec>,
        }
        let roster: Roster = toml::from_str(
            r#"
[[agents]]
persona = "statistician"

[[agents]]
persona = "risk_assessor"
provider = "llm"
"#,
        )
        .unwrap();
        assert_eq!(
            roster.agents,
            vec![
                AgentSpec::deterministic(Persona::Statistician),
                AgentSpec::llm(Persona::RiskAssessor)
            ]
        );
    }

    #[test]
    fn test_with_remainder_sums_to_one() {
        let p = with_remainder(0.28000000000000003, 0.33);
        assert_eq!(p, Probabilities::new(0.28, 0.33, 0.39));
        let p = with_remainder(0.9, 0.33);
        assert_eq!(p, Probabilities::new(0.9, 0.1, 0.0));
    }
}
