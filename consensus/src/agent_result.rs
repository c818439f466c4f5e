//! Agent results and the three-way outcome distribution.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Value substituted for a missing or non-finite probability channel.
pub const MISSING_PROBABILITY: f64 = 0.33;

/// Match outcome channel.
///
/// Declaration order is the tie-break priority: `Home > Draw > Away`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "home_win")]
    Home,
    #[serde(rename = "draw")]
    Draw,
    #[serde(rename = "away_win")]
    Away,
}

impl Outcome {
    /// All channels in priority order.
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    /// Snake-case key used in JSON payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Home => "home_win",
            Self::Draw => "draw",
            Self::Away => "away_win",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home Win",
            Self::Draw => "Draw",
            Self::Away => "Away Win",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A home / draw / away probability triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl Probabilities {
    /// Returned whenever no weighted evidence exists.
    pub const UNIFORM_PRIOR: Self = Self {
        home_win: 0.33,
        draw: 0.34,
        away_win: 0.33,
    };

    pub fn new(home_win: f64, draw: f64, away_win: f64) -> Self {
        Self {
            home_win,
            draw,
            away_win,
        }
    }

    /// Build from integer hundredths.
    pub fn from_cents(home: i64, draw: i64, away: i64) -> Self {
        Self::new(
            home as f64 / 100.0,
            draw as f64 / 100.0,
            away as f64 / 100.0,
        )
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home_win,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away_win,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home_win + self.draw + self.away_win
    }

    /// Apply `f` to every channel.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.home_win), f(self.draw), f(self.away_win))
    }

    /// Most likely outcome. Ties go to the earlier channel in [`Outcome::ALL`].
    pub fn most_likely(&self) -> Outcome {
        let mut best = Outcome::Home;
        for outcome in &Outcome::ALL[1..] {
            if self.get(*outcome) > self.get(best) {
                best = *outcome;
            }
        }
        best
    }
}

/// Output of one agent for one match.
///
/// Probability channels are optional: an agent that could not produce a
/// channel leaves it out and the aggregator substitutes
/// [`MISSING_PROBABILITY`]. Channels are not required to sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Identifier matched against the weights table.
    #[serde(alias = "agent", alias = "agentId")]
    pub agent_id: String,
    #[serde(default, alias = "homeWin", deserialize_with = "lenient::float")]
    pub home_win: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub draw: Option<f64>,
    #[serde(default, alias = "awayWin", deserialize_with = "lenient::float")]
    pub away_win: Option<f64>,
    /// Self-reported certainty (0.0–1.0).
    #[serde(default, deserialize_with = "lenient::float")]
    pub confidence: Option<f64>,
    /// Free-text explanation, display only.
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub key_factors: Vec<String>,
}

impl AgentResult {
    /// Create a result with all three channels present and no confidence.
    pub fn new(agent_id: impl Into<String>, home_win: f64, draw: f64, away_win: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            home_win: Some(home_win),
            draw: Some(draw),
            away_win: Some(away_win),
            confidence: None,
            reasoning: String::new(),
            key_factors: Vec::new(),
        }
    }

    /// Create a result with no channels at all.
    pub fn empty(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            home_win: None,
            draw: None,
            away_win: None,
            confidence: None,
            reasoning: String::new(),
            key_factors: Vec::new(),
        }
    }

    /// Degraded result for an agent whose upstream call failed:
    /// uniform prior, zero confidence.
    pub fn neutral(agent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let prior = Probabilities::UNIFORM_PRIOR;
        Self::new(agent_id, prior.home_win, prior.draw, prior.away_win)
            .with_confidence(0.0)
            .with_reasoning(reason)
    }

    /// Create from a full probability triple.
    pub fn from_probabilities(agent_id: impl Into<String>, probabilities: Probabilities) -> Self {
        Self::new(
            agent_id,
            probabilities.home_win,
            probabilities.draw,
            probabilities.away_win,
        )
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_key_factors(mut self, factors: Vec<String>) -> Self {
        self.key_factors = factors;
        self
    }

    /// Raw channel as reported, if present.
    pub fn reported(&self, outcome: Outcome) -> Option<f64> {
        match outcome {
            Outcome::Home => self.home_win,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away_win,
        }
    }

    /// Mutable access to a raw channel.
    pub fn reported_mut(&mut self, outcome: Outcome) -> &mut Option<f64> {
        match outcome {
            Outcome::Home => &mut self.home_win,
            Outcome::Draw => &mut self.draw,
            Outcome::Away => &mut self.away_win,
        }
    }

    /// Channel value used in arithmetic: missing or non-finite values become
    /// [`MISSING_PROBABILITY`], everything else is clamped into [0, 1].
    pub fn value(&self, outcome: Outcome) -> f64 {
        self.reported(outcome)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(MISSING_PROBABILITY)
    }

    /// All three channels with defaults applied.
    pub fn probabilities(&self) -> Probabilities {
        Probabilities::new(
            self.value(Outcome::Home),
            self.value(Outcome::Draw),
            self.value(Outcome::Away),
        )
    }

    /// Self-reported confidence; missing counts as no confidence.
    pub fn confidence_or_zero(&self) -> f64 {
        self.confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }

    /// Whether every channel was reported with a finite value.
    pub fn is_complete(&self) -> bool {
        Outcome::ALL
            .iter()
            .all(|o| self.reported(*o).is_some_and(f64::is_finite))
    }
}
