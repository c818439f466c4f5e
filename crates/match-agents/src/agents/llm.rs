//! Persona agent backed by a [`TextGenerator`].
//!
//! The model is asked for a JSON object. Replies are read leniently: prose
//! around the object is skipped, both `home_win` and `home_win_probability`
//! key styles are accepted, percentages are scaled down and a complete
//! triple is renormalized. Any failure yields a neutral result.

use std::sync::Arc;

use async_trait::async_trait;
use consensus::{as_number, round_to, AgentResult, MatchContext, Outcome};
use serde_json::Value;
use tracing::{debug, warn};

use super::Agent;
use crate::client::TextGenerator;
use crate::persona::Persona;

/// Accepted keys per channel, in lookup order.
const HOME_KEYS: &[&str] = &["home_win", "home_win_probability", "homeWin", "home"];
const DRAW_KEYS: &[&str] = &["draw", "draw_probability", "drawProbability"];
const AWAY_KEYS: &[&str] = &["away_win", "away_win_probability", "awayWin", "away"];

/// Slack before a complete triple is renormalized.
const SUM_TOLERANCE: f64 = 0.01;

/// Why a reply could not be used.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyError {
    NoJsonObject,
    InvalidJson(String),
    NoProbabilities,
}

impl std::fmt::Display for ReplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoJsonObject => write!(f, "no JSON object in reply"),
            Self::InvalidJson(e) => write!(f, "invalid JSON: {e}"),
            Self::NoProbabilities => write!(f, "reply has no probability fields"),
        }
    }
}

pub struct LlmAgent<G: ?Sized> {
    persona: Persona,
    generator: Arc<G>,
}

impl<G: TextGenerator + ?Sized> LlmAgent<G> {
    pub fn new(persona: Persona, generator: Arc<G>) -> Self {
        Self { persona, generator }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// User prompt for `context`.
    pub fn build_prompt(&self, context: &MatchContext) -> String {
        let persona = self.persona;
        let mut lines = vec![
            "Match Analysis Request:".to_string(),
            format!("Home Team: {}", context.home_team),
            format!("Away Team: {}", context.away_team),
            String::new(),
        ];

        let quantitative = context.quantitative_features.describe();
        if !quantitative.is_empty() {
            lines.push("Quantitative Data:".to_string());
            lines.extend(quantitative.into_iter().map(|l| format!("  - {l}")));
            lines.push(String::new());
        }

        let qualitative = context.qualitative_context.describe();
        if !qualitative.is_empty() {
            lines.push("Qualitative Context:".to_string());
            lines.extend(qualitative.into_iter().map(|l| format!("  - {l}")));
            lines.push(String::new());
        }

        if let Some(baseline) = &context.baseline_prediction {
            lines.push("Baseline Model Prediction:".to_string());
            for outcome in Outcome::ALL {
                lines.push(format!(
                    "  - {}: {:.1}%",
                    outcome.label(),
                    baseline.get(outcome) * 100.0
                ));
            }
            lines.push(String::new());
        }

        if let Some(peers) = &context.peer_summary {
            let avg = &peers.average_prediction;
            lines.push(format!(
                "Peer Analyses (previous round, {} agents):",
                peers.num_agents
            ));
            lines.push(format!(
                "  - Average: Home {:.1}% | Draw {:.1}% | Away {:.1}%",
                avg.home_win * 100.0,
                avg.draw * 100.0,
                avg.away_win * 100.0
            ));
            if !peers.key_factors.is_empty() {
                lines.push(format!("  - Shared factors: {}", peers.key_factors.join(", ")));
            }
            lines.push("Revise your view if the peers raise something you missed.".to_string());
            lines.push(String::new());
        }

        lines.push(format!("Your Task (as {}):", persona.display_name()));
        lines.push(format!(
            "Analyze this match from your perspective as a {}.",
            persona.role()
        ));
        lines.push(format!("Focus on: {}", persona.focus_areas().join(", ")));
        lines.push(String::new());
        lines.push("Respond with a single JSON object:".to_string());
        lines.push(
            r#"{"home_win": <0-1>, "draw": <0-1>, "away_win": <0-1>, "confidence": <0-1>, "reasoning": "<one or two sentences>", "key_factors": ["<factor>", "..."]}"#
                .to_string(),
        );
        lines.join("\n")
    }

    /// Turn a raw reply into a result for this persona.
    pub fn parse_reply(&self, raw: &str) -> Result<AgentResult, ReplyError> {
        let object = first_json_object(raw)?;
        let mut result = AgentResult::empty(self.persona.id());

        for (outcome, keys) in [
            (Outcome::Home, HOME_KEYS),
            (Outcome::Draw, DRAW_KEYS),
            (Outcome::Away, AWAY_KEYS),
        ] {
            *result.reported_mut(outcome) =
                keys.iter().find_map(|k| object.get(*k).and_then(as_number));
        }
        if Outcome::ALL.iter().all(|o| result.reported(*o).is_none()) {
            return Err(ReplyError::NoProbabilities);
        }
        scale_and_normalize(&mut result);

        result.confidence = object
            .get("confidence")
            .and_then(as_number)
            .map(|c| if c > 1.0 { c / 100.0 } else { c })
            .map(|c| c.clamp(0.0, 1.0));
        result.reasoning = object
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        result.key_factors = object
            .get("key_factors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(result)
    }
}

/// First complete JSON object in `raw`, ignoring anything around it.
fn first_json_object(raw: &str) -> Result<serde_json::Map<String, Value>, ReplyError> {
    let start = raw.find('{').ok_or(ReplyError::NoJsonObject)?;
    let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(map))) => Ok(map),
        Some(Ok(_)) | None => Err(ReplyError::NoJsonObject),
        Some(Err(e)) => Err(ReplyError::InvalidJson(e.to_string())),
    }
}

/// Percent-scale replies are divided by 100; a complete triple that misses
/// one by more than [`SUM_TOLERANCE`] is rescaled.
fn scale_and_normalize(result: &mut AgentResult) {
    let present: Vec<f64> = Outcome::ALL.iter().filter_map(|o| result.reported(*o)).collect();
    if present.iter().any(|v| *v > 1.0) {
        for outcome in Outcome::ALL {
            if let Some(v) = result.reported_mut(outcome) {
                *v /= 100.0;
            }
        }
    }
    if !result.is_complete() {
        return;
    }
    let sum: f64 = Outcome::ALL.iter().filter_map(|o| result.reported(*o)).sum();
    if sum > 0.0 && (sum - 1.0).abs() > SUM_TOLERANCE {
        for outcome in Outcome::ALL {
            if let Some(v) = result.reported_mut(outcome) {
                *v = round_to(*v / sum, 4);
            }
        }
    }
}

#[async_trait]
impl<G: TextGenerator + ?Sized + 'static> Agent for LlmAgent<G> {
    fn id(&self) -> &str {
        self.persona.id()
    }

    async fn analyze(&self, context: &MatchContext) -> AgentResult {
        let id = self.persona.id();
        let prompt = self.build_prompt(context);

        let raw = match self
            .generator
            .generate(self.persona.system_prompt(), &prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(agent = id, error = %e, "Generation failed, reporting neutral");
                return AgentResult::neutral(id, format!("Analysis unavailable: {e}"));
            }
        };

        match self.parse_reply(&raw) {
            Ok(result) => {
                debug!(
                    agent = id,
                    home = ?result.home_win,
                    draw = ?result.draw,
                    away = ?result.away_win,
                    "Reply parsed"
                );
                result
            }
            Err(e) => {
                warn!(agent = id, error = %e, "Unusable reply, reporting neutral");
                AgentResult::neutral(id, format!("Analysis unavailable: {e}"))
            }
        }
    }
}
