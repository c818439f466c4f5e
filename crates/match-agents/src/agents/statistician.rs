//! Rule-based statistician: head-to-head record and table gap.

use async_trait::async_trait;
use consensus::{round_to, AgentResult, MatchContext, Probabilities, MISSING_PROBABILITY};
use tracing::debug;

use super::{with_remainder, Agent};
use crate::persona::Persona;

/// Home win percentage above which the home side dominates the fixture.
const DOMINANT_H2H_PCT: f64 = 50.0;
/// Home win percentage below which the away side has the upper hand.
const WEAK_H2H_PCT: f64 = 40.0;
/// Places between the sides before the table matters.
const TABLE_GAP_THRESHOLD: i64 = 5;

const DRAW_SHARE: f64 = 0.33;
const NO_DATA_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct StatisticianAgent;

impl StatisticianAgent {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`Agent::analyze`].
    pub fn assess(&self, context: &MatchContext) -> AgentResult {
        let features = &context.quantitative_features;
        let id = Persona::Statistician.id();
        let h2h = features.head_to_head();
        let gap = features
            .home_position
            .zip(features.away_position)
            .map(|(home, away)| i64::from(away) - i64::from(home));

        if h2h.is_none() && gap.is_none() {
            return AgentResult::from_probabilities(id, Probabilities::UNIFORM_PRIOR)
                .with_confidence(NO_DATA_CONFIDENCE)
                .with_reasoning("No head-to-head or standings data; holding the prior.");
        }

        let mut home = MISSING_PROBABILITY;
        let mut reasons = Vec::new();
        let mut factors = Vec::new();
        let mut confidence = 0.4;

        if let Some(h2h) = h2h {
            let pct = h2h.home_win_pct;
            if pct > DOMINANT_H2H_PCT {
                home += 0.10;
                factors.push("Head-to-head dominance".to_string());
            } else if pct < WEAK_H2H_PCT {
                home -= 0.05;
                factors.push("Poor head-to-head record".to_string());
            } else {
                home += 0.03;
                factors.push("Balanced head-to-head".to_string());
            }
            reasons.push(format!(
                "{} have won {:.1}% of {} meetings ({}W {}D {}L).",
                context.home_team, pct, h2h.games, h2h.home_wins, h2h.draws, h2h.away_wins
            ));
            confidence += f64::from(h2h.games.min(40)) * 0.01;
        }

        if let Some(gap) = gap {
            if gap > TABLE_GAP_THRESHOLD {
                home += 0.05;
                factors.push("League position gap".to_string());
                reasons.push(format!(
                    "{} sit {gap} places above {} in the table.",
                    context.home_team, context.away_team
                ));
            } else if gap < -TABLE_GAP_THRESHOLD {
                home -= 0.05;
                factors.push("League position gap".to_string());
                reasons.push(format!(
                    "{} sit {} places above {} in the table.",
                    context.away_team, -gap, context.home_team
                ));
            } else {
                reasons.push("The sides are close in the table.".to_string());
            }
            confidence += 0.1;
        }

        let prediction = with_remainder(home, DRAW_SHARE);
        let confidence = round_to(confidence.min(0.9), 2);
        debug!(
            home = prediction.home_win,
            draw = prediction.draw,
            away = prediction.away_win,
            confidence,
            "Statistician assessment"
        );

        AgentResult::from_probabilities(id, prediction)
            .with_confidence(confidence)
            .with_reasoning(reasons.join(" "))
            .with_key_factors(factors)
    }
}

#[async_trait]
impl Agent for StatisticianAgent {
    fn id(&self) -> &str {
        Persona::Statistician.id()
    }

    async fn analyze(&self, context: &MatchContext) -> AgentResult {
        self.assess(context)
    }
}
