//! Rule-based tactician: home ground and squad churn.

use async_trait::async_trait;
use consensus::{round_to, AgentResult, MatchContext, Probabilities, QualitativeContext};
use serde_json::Value;
use tracing::debug;

use super::{with_remainder, Agent};
use crate::persona::Persona;

/// Crowd size that counts as a fortress.
const LARGE_CAPACITY: u32 = 40_000;
const VENUE_EDGE: f64 = 0.04;
const CROWD_EDGE: f64 = 0.02;
/// Per net signing, capped at [`MAX_NET_SIGNINGS`].
const SIGNING_EDGE: f64 = 0.01;
const MAX_NET_SIGNINGS: i64 = 3;

const DRAW_SHARE: f64 = 0.33;
const NO_DATA_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct TacticianAgent;

impl TacticianAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, context: &MatchContext) -> AgentResult {
        let id = Persona::Tactician.id();
        let qualitative = &context.qualitative_context;
        let mut home = 0.33;
        let mut signals = 0u32;
        let mut reasons = Vec::new();
        let mut factors = Vec::new();

        if let Some(ground) = qualitative.home_ground() {
            home += VENUE_EDGE;
            signals += 1;
            factors.push("Home venue".to_string());
            reasons.push(format!("{} host at {ground}.", context.home_team));

            if let Some(capacity) = qualitative.home_capacity {
                if capacity >= LARGE_CAPACITY {
                    home += CROWD_EDGE;
                    factors.push("Large home crowd".to_string());
                    reasons.push(format!("A crowd of up to {capacity} backs the hosts."));
                }
            }
        }

        let signings = (
            signings(context, qualitative, Side::Home),
            signings(context, qualitative, Side::Away),
        );
        if let (Some(home_in), Some(away_in)) = signings {
            let net = (i64::from(home_in) - i64::from(away_in))
                .clamp(-MAX_NET_SIGNINGS, MAX_NET_SIGNINGS);
            home += net as f64 * SIGNING_EDGE;
            signals += 1;
            if net != 0 {
                factors.push("Squad investment".to_string());
            }
            reasons.push(format!(
                "Recent signings: {} {home_in}, {} {away_in}.",
                context.home_team, context.away_team
            ));
        }

        if signals == 0 {
            return AgentResult::from_probabilities(id, Probabilities::UNIFORM_PRIOR)
                .with_confidence(NO_DATA_CONFIDENCE)
                .with_reasoning("No venue or squad information; holding the prior.");
        }

        let prediction = with_remainder(home, DRAW_SHARE);
        let confidence = round_to(0.45 + 0.1 * f64::from(signals), 2);
        debug!(
            home = prediction.home_win,
            away = prediction.away_win,
            signals,
            "Tactician assessment"
        );

        AgentResult::from_probabilities(id, prediction)
            .with_confidence(confidence)
            .with_reasoning(reasons.join(" "))
            .with_key_factors(factors)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Home,
    Away,
}

/// Signing count from the typed feature, falling back to the same key in the
/// qualitative block where some feeds put it.
fn signings(context: &MatchContext, qualitative: &QualitativeContext, side: Side) -> Option<u32> {
    let (typed, key) = match side {
        Side::Home => (
            context.quantitative_features.home_recent_signings,
            "home_recent_signings",
        ),
        Side::Away => (
            context.quantitative_features.away_recent_signings,
            "away_recent_signings",
        ),
    };
    typed.or_else(|| {
        qualitative
            .extra_path(&[key])
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    })
}

#[async_trait]
impl Agent for TacticianAgent {
    fn id(&self) -> &str {
        Persona::Tactician.id()
    }

    async fn analyze(&self, context: &MatchContext) -> AgentResult {
        self.assess(context)
    }
}
