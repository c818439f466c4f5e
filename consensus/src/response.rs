//! Serializable prediction response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_result::{AgentResult, Probabilities};
use crate::aggregator::ConsensusResult;
use crate::summary::{DebateReport, WeightedContribution};
use crate::weights::AgentWeights;

/// One agent's entry in [`PredictionResponse::agent_analyses`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAnalysis {
    pub agent: String,
    pub weight: f64,
    pub prediction: Probabilities,
    pub confidence: f64,
    pub reasoning: String,
    /// `prediction × weight`, three decimals.
    pub weighted_contribution: Probabilities,
    pub key_factors: Vec<String>,
}

impl AgentAnalysis {
    pub fn from_result(result: &AgentResult, weights: &AgentWeights) -> Self {
        let weight = weights.weight_for(&result.agent_id);
        Self {
            agent: result.agent_id.clone(),
            weight,
            prediction: result.probabilities(),
            confidence: result.confidence_or_zero(),
            reasoning: result.reasoning.clone(),
            weighted_contribution: WeightedContribution::for_result(result, weight)
                .as_probabilities(),
            key_factors: result.key_factors.clone(),
        }
    }
}

/// Full answer for one match: consensus, per-agent breakdown and the
/// debate summary in both text and structured form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub consensus_prediction: Probabilities,
    pub confidence: f64,
    pub agreement_score: f64,
    pub debate_summary: String,
    pub agent_analyses: Vec<AgentAnalysis>,
    pub report: DebateReport,
    pub generated_at: DateTime<Utc>,
}

impl PredictionResponse {
    pub fn assemble(
        results: &[AgentResult],
        weights: &AgentWeights,
        consensus: &ConsensusResult,
        report: DebateReport,
    ) -> Self {
        Self {
            consensus_prediction: consensus.prediction,
            confidence: consensus.confidence,
            agreement_score: consensus.agreement_score,
            debate_summary: report.to_string(),
            agent_analyses: results
                .iter()
                .map(|result| AgentAnalysis::from_result(result, weights))
                .collect(),
            report,
            generated_at: Utc::now(),
        }
    }
}
