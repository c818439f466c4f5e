//! Debate summary: a structured projection of one consensus run.
//!
//! The report is built from already-computed values; nothing here
//! recalculates probabilities. [`DebateReport`] serializes for API
//! responses and implements `Display` for the plain-text rendering.
//!
//! # Report order
//!
//! 1. Match header
//! 2. One block per agent: weight, prediction (%, 1 dp), confidence, reasoning
//! 3. Weighted contributions (`value × weight`, 3 dp)
//! 4. Consensus (%, 2 dp) with the most likely outcome

mod text;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::agent_result::{AgentResult, Outcome, Probabilities};
use crate::aggregator::{round_to, AgreementLevel, ConsensusResult};
use crate::weights::AgentWeights;

pub use text::wrap_text;

/// Column width for wrapped reasoning text.
pub const REASONING_WRAP_WIDTH: usize = 72;

/// Most shared key factors listed in a report.
const MAX_COMMON_FACTORS: usize = 5;

/// One agent's section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentBlock {
    pub agent_id: String,
    pub weight: f64,
    /// Prediction in percent, one decimal.
    pub prediction_pct: Probabilities,
    /// Self-reported confidence in percent, one decimal.
    pub confidence_pct: f64,
    pub reasoning: String,
    /// `reasoning` wrapped at [`REASONING_WRAP_WIDTH`].
    pub reasoning_lines: Vec<String>,
    pub key_factors: Vec<String>,
}

/// Per-agent `value × weight`, exposing the arithmetic behind the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedContribution {
    pub agent_id: String,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl WeightedContribution {
    pub fn for_result(result: &AgentResult, weight: f64) -> Self {
        let contribution = |outcome| round_to(result.value(outcome) * weight, 3);
        Self {
            agent_id: result.agent_id.clone(),
            home_win: contribution(Outcome::Home),
            draw: contribution(Outcome::Draw),
            away_win: contribution(Outcome::Away),
        }
    }

    pub fn as_probabilities(&self) -> Probabilities {
        Probabilities::new(self.home_win, self.draw, self.away_win)
    }
}

/// Final section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusBlock {
    /// Consensus in percent, two decimals.
    pub prediction_pct: Probabilities,
    pub most_likely: Outcome,
    pub most_likely_pct: f64,
    pub confidence_pct: f64,
    pub agreement_score: f64,
    pub agreement_level: AgreementLevel,
    pub fallback_prior: bool,
    #[serde(default)]
    pub degraded: bool,
}

/// Structured debate summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateReport {
    pub home_team: String,
    pub away_team: String,
    pub agents: Vec<AgentBlock>,
    pub contributions: Vec<WeightedContribution>,
    pub consensus: ConsensusBlock,
    /// Factors cited by at least two agents, in first-mention order.
    pub common_factors: Vec<String>,
}

impl DebateReport {
    /// Project results and their consensus into a report.
    pub fn render(
        results: &[AgentResult],
        weights: &AgentWeights,
        consensus: &ConsensusResult,
        home_team: &str,
        away_team: &str,
    ) -> Self {
        let agents = results
            .iter()
            .map(|result| agent_block(result, weights.weight_for(&result.agent_id)))
            .collect();

        let contributions = results
            .iter()
            .map(|result| {
                WeightedContribution::for_result(result, weights.weight_for(&result.agent_id))
            })
            .collect();

        let prediction_pct = consensus.prediction.map(|p| round_to(p * 100.0, 2));
        let most_likely = consensus.most_likely();

        Self {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            agents,
            contributions,
            consensus: ConsensusBlock {
                prediction_pct,
                most_likely,
                most_likely_pct: prediction_pct.get(most_likely),
                confidence_pct: round_to(consensus.confidence * 100.0, 2),
                agreement_score: consensus.agreement_score,
                agreement_level: consensus.agreement_level(),
                fallback_prior: consensus.fallback_prior,
                degraded: consensus.degraded,
            },
            common_factors: common_factors(results),
        }
    }
}

fn agent_block(result: &AgentResult, weight: f64) -> AgentBlock {
    AgentBlock {
        agent_id: result.agent_id.clone(),
        weight,
        prediction_pct: result.probabilities().map(|p| round_to(p * 100.0, 1)),
        confidence_pct: round_to(result.confidence_or_zero() * 100.0, 1),
        reasoning: result.reasoning.clone(),
        reasoning_lines: wrap_text(&result.reasoning, REASONING_WRAP_WIDTH),
        key_factors: result.key_factors.clone(),
    }
}

/// Factors cited by two or more agents. Matching ignores case and
/// surrounding whitespace; an agent repeating a factor counts once.
pub fn common_factors(results: &[AgentResult]) -> Vec<String> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for result in results {
        let mut seen = HashSet::new();
        for factor in &result.key_factors {
            let display = factor.trim();
            if display.is_empty() {
                continue;
            }
            let key = display.to_lowercase();
            if !seen.insert(key.clone()) {
                continue;
            }
            let count = counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                order.push((key, display.to_string()));
            }
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter(|(key, _)| counts.get(key).copied().unwrap_or(0) >= 2)
        .map(|(_, display)| display)
        .take(MAX_COMMON_FACTORS)
        .collect()
}
