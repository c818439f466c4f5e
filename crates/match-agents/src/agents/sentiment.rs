//! Rule-based sentiment analyst: headline keywords and pre-match hype.

use std::sync::LazyLock;

use async_trait::async_trait;
use consensus::{round_to, AgentResult, MatchContext, Probabilities};
use regex::Regex;
use tracing::debug;

use super::{with_remainder, Agent};
use crate::persona::Persona;

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sack(ed|ing)?|crisis|injur(y|ies|ed))\b")
        .expect("NEGATIVE_RE regex should compile")
});

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(troph(y|ies)|unbeaten|winning (streak|run))\b")
        .expect("POSITIVE_RE regex should compile")
});

/// Probability moved per net headline.
const HEADLINE_SHIFT: f64 = 0.05;
const MAX_SHIFT: f64 = 0.15;
/// Draw adjustment for a hyped or a flat fixture.
const EXCITEMENT_NUDGE: f64 = 0.02;
const HIGH_EXCITEMENT: f64 = 7.0;
const LOW_EXCITEMENT: f64 = 4.0;

const NO_DATA_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct SentimentAgent;

/// Net tone of one headline: +1, 0 or -1.
fn tone(text: &str) -> i32 {
    i32::from(POSITIVE_RE.is_match(text)) - i32::from(NEGATIVE_RE.is_match(text))
}

impl SentimentAgent {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, context: &MatchContext) -> AgentResult {
        let id = Persona::SentimentAnalyst.id();
        let qualitative = &context.qualitative_context;
        let home_name = context.home_team.to_lowercase();
        let away_name = context.away_team.to_lowercase();

        let mut home_score = 0;
        let mut away_score = 0;
        let mut matched = 0u32;
        let mut reasons = Vec::new();

        let texts = qualitative
            .recent_news
            .iter()
            .chain(qualitative.narrative.as_ref());
        for text in texts {
            let lower = text.to_lowercase();
            let about_home = lower.contains(&home_name);
            let about_away = lower.contains(&away_name);
            let tone = tone(text);
            if tone == 0 || about_home == about_away {
                continue;
            }
            matched += 1;
            if about_home {
                home_score += tone;
            } else {
                away_score += tone;
            }
            reasons.push(format!("\"{}\"", text.trim()));
        }

        let excitement = qualitative.excitement_rating;
        if matched == 0 && excitement.is_none() {
            return AgentResult::from_probabilities(id, Probabilities::UNIFORM_PRIOR)
                .with_confidence(NO_DATA_CONFIDENCE)
                .with_reasoning("No telling headlines or hype signal; holding the prior.");
        }

        let mut factors = Vec::new();
        let sides = [
            (home_score, &context.home_team),
            (away_score, &context.away_team),
        ];
        for (score, team) in sides {
            if score < 0 {
                factors.push(format!("Negative press: {team}"));
            } else if score > 0 {
                factors.push(format!("Positive momentum: {team}"));
            }
        }

        let shift =
            (f64::from(home_score - away_score) * HEADLINE_SHIFT).clamp(-MAX_SHIFT, MAX_SHIFT);
        let mut home = 0.33 + shift;
        let mut draw = 0.33;

        let mut confidence = 0.4 + 0.05 * f64::from(matched.min(6));
        if let Some(rating) = excitement {
            let nudge = if rating >= HIGH_EXCITEMENT {
                factors.push("High excitement".to_string());
                -EXCITEMENT_NUDGE
            } else if rating <= LOW_EXCITEMENT {
                factors.push("Low-key fixture".to_string());
                EXCITEMENT_NUDGE
            } else {
                0.0
            };
            draw += nudge;
            home -= nudge / 2.0;
            confidence += 0.05;
            reasons.push(format!("Excitement rating {rating:.1}/10."));
        }

        let prediction = with_remainder(home, draw);
        let confidence = round_to(confidence.min(0.75), 2);
        debug!(
            home_score,
            away_score,
            matched,
            home = prediction.home_win,
            draw = prediction.draw,
            "Sentiment assessment"
        );

        let reasoning = if matched > 0 {
            format!("Headlines read: {}", reasons.join(" "))
        } else {
            reasons.join(" ")
        };

        AgentResult::from_probabilities(id, prediction)
            .with_confidence(confidence)
            .with_reasoning(reasoning)
            .with_key_factors(factors)
    }
}

#[async_trait]
impl Agent for SentimentAgent {
    fn id(&self) -> &str {
        Persona::SentimentAnalyst.id()
    }

    async fn analyze(&self, context: &MatchContext) -> AgentResult {
        self.assess(context)
    }
}
