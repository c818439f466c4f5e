//! Weighted consensus over agent results.
//!
//! # Algorithm
//!
//! ```text
//! weighted[c] = Σ value(r, c) × weight(r)          value defaults to 0.33
//! raw[c]      = weighted[c] / Σ weight(r)
//! cents[c]    = round(raw[c] × 100)                 half away from zero
//! if Σ cents != 100: away = 100 − home − draw       home and draw are fixed
//! if away < 0:       away = 0, excess leaves the larger of home/draw
//! ```
//!
//! Zero total weight (including an empty roster) yields the uniform prior
//! `(0.33, 0.34, 0.33)`. Confidence and agreement come from the spread of
//! the agents' home-win values, not from what the agents claim. When every
//! agent reports an explicit zero confidence (all degraded), the spread says
//! nothing: confidence drops to the floor and agreement to 0.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent_result::{AgentResult, Outcome, Probabilities};
use crate::weights::AgentWeights;

/// Lower bound for spread-based confidence.
const MIN_SPREAD_CONFIDENCE: f64 = 0.3;

/// Variance multiplier in `1 − variance × k`.
const VARIANCE_PENALTY: f64 = 3.0;

/// Spread multiplier in `1 − max_diff × k`.
const SPREAD_PENALTY: f64 = 2.0;

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// How the overall confidence figure is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidencePolicy {
    /// `clamp(1 − var(home_win) × 3, 0.3, 1.0)`.
    #[default]
    Spread,
    /// Mean of the agents' self-reported confidence.
    SelfReported,
}

impl std::fmt::Display for ConfidencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spread => write!(f, "spread"),
            Self::SelfReported => write!(f, "self-reported"),
        }
    }
}

impl std::str::FromStr for ConfidencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spread" | "variance" => Ok(Self::Spread),
            "self-reported" | "self_reported" | "reported" => Ok(Self::SelfReported),
            other => Err(format!("unknown confidence policy: {other}")),
        }
    }
}

/// Qualitative band of an agreement score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    High,
    Moderate,
    Low,
}

impl AgreementLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score > 0.5 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for AgreementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Combined prediction for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Non-negative, sums to 1.00 at two decimals.
    pub prediction: Probabilities,
    pub confidence: f64,
    /// 1.0 when agents agree on the home-win channel, 0.0 at ≥ 0.5 spread.
    pub agreement_score: f64,
    pub agent_count: usize,
    pub total_weight: f64,
    /// True when the uniform prior was returned for lack of weighted evidence.
    #[serde(default)]
    pub fallback_prior: bool,
    /// True when every agent reported zero confidence.
    #[serde(default)]
    pub degraded: bool,
}

impl ConsensusResult {
    pub fn agreement_level(&self) -> AgreementLevel {
        AgreementLevel::from_score(self.agreement_score)
    }

    pub fn most_likely(&self) -> Outcome {
        self.prediction.most_likely()
    }
}

/// Pure, stateless combiner of agent results.
#[derive(Debug, Clone, Default)]
pub struct ConsensusAggregator {
    weights: AgentWeights,
    policy: ConfidencePolicy,
}

impl ConsensusAggregator {
    pub fn new(weights: AgentWeights) -> Self {
        Self {
            weights,
            policy: ConfidencePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConfidencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn weights(&self) -> &AgentWeights {
        &self.weights
    }

    pub fn policy(&self) -> ConfidencePolicy {
        self.policy
    }

    /// Combine `results` into one distribution. Never fails.
    pub fn aggregate(&self, results: &[AgentResult]) -> ConsensusResult {
        aggregate_with(results, &self.weights, self.policy)
    }
}

/// Aggregate with the default [`ConfidencePolicy::Spread`].
pub fn aggregate(results: &[AgentResult], weights: &AgentWeights) -> ConsensusResult {
    aggregate_with(results, weights, ConfidencePolicy::Spread)
}

fn aggregate_with(
    results: &[AgentResult],
    weights: &AgentWeights,
    policy: ConfidencePolicy,
) -> ConsensusResult {
    let total_weight: f64 = results
        .iter()
        .map(|r| weights.weight_for(&r.agent_id))
        .sum();

    let (prediction, fallback_prior) = match weighted_prediction(results, weights, total_weight) {
        Some(prediction) => (prediction, false),
        None => {
            warn!(
                agents = results.len(),
                total_weight, "No weighted evidence, falling back to uniform prior"
            );
            (Probabilities::UNIFORM_PRIOR, true)
        }
    };

    let mut confidence = match policy {
        ConfidencePolicy::Spread => spread_confidence(results),
        ConfidencePolicy::SelfReported => self_reported_confidence(results),
    };
    let mut agreement_score = agreement_score(results);

    let degraded = all_degraded(results);
    if degraded {
        warn!(
            agents = results.len(),
            "Every agent degraded, reporting floor confidence"
        );
        confidence = confidence.min(MIN_SPREAD_CONFIDENCE);
        agreement_score = 0.0;
    }

    debug!(
        agents = results.len(),
        total_weight,
        home = prediction.home_win,
        draw = prediction.draw,
        away = prediction.away_win,
        confidence,
        agreement_score,
        %policy,
        "Consensus computed"
    );

    ConsensusResult {
        prediction,
        confidence,
        agreement_score,
        agent_count: results.len(),
        total_weight,
        fallback_prior,
        degraded,
    }
}

/// Non-empty roster where every result carries an explicit zero confidence.
/// A missing confidence is not a failure signal.
fn all_degraded(results: &[AgentResult]) -> bool {
    !results.is_empty()
        && results
            .iter()
            .all(|r| matches!(r.confidence, Some(c) if c <= 0.0))
}

/// Weighted average rounded to cents with the away channel absorbing the
/// residual. `None` when there is no weight to divide by.
fn weighted_prediction(
    results: &[AgentResult],
    weights: &AgentWeights,
    total_weight: f64,
) -> Option<Probabilities> {
    if results.is_empty() || !total_weight.is_finite() || total_weight <= 0.0 {
        return None;
    }

    let mut raw = [0.0_f64; 3];
    for result in results {
        let weight = weights.weight_for(&result.agent_id);
        for (slot, outcome) in raw.iter_mut().zip(Outcome::ALL) {
            *slot += result.value(outcome) * weight;
        }
    }
    for slot in &mut raw {
        *slot /= total_weight;
    }

    let [mut home, mut draw, mut away] = raw.map(to_cents);
    if home + draw + away != 100 {
        away = 100 - home - draw;
        if away < 0 {
            let excess = -away;
            away = 0;
            if home >= draw {
                home -= excess;
            } else {
                draw -= excess;
            }
        }
    }

    Some(Probabilities::from_cents(home, draw, away))
}

fn spread_confidence(results: &[AgentResult]) -> f64 {
    if results.is_empty() {
        return MIN_SPREAD_CONFIDENCE;
    }
    let homes: Vec<f64> = results.iter().map(|r| r.value(Outcome::Home)).collect();
    let n = homes.len() as f64;
    let mean = homes.iter().sum::<f64>() / n;
    let variance = homes.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / n;
    round_to(
        (1.0 - variance * VARIANCE_PENALTY).clamp(MIN_SPREAD_CONFIDENCE, 1.0),
        2,
    )
}

fn self_reported_confidence(results: &[AgentResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results.iter().map(AgentResult::confidence_or_zero).sum();
    round_to(total / results.len() as f64, 2)
}

fn agreement_score(results: &[AgentResult]) -> f64 {
    match results.len() {
        0 => 0.0,
        1 => 1.0,
        _ => {
            let (min, max) = results
                .iter()
                .map(|r| r.value(Outcome::Home))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| {
                    (lo.min(h), hi.max(h))
                });
            round_to((1.0 - (max - min) * SPREAD_PENALTY).clamp(0.0, 1.0), 2)
        }
    }
}
