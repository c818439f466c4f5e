//! Match context record: the input handed to every agent.
//!
//! Built fresh per prediction by the data-fetching layer and never mutated
//! once agents receive it. Known feature keys are typed; unknown keys are
//! kept in `extra` maps and ignored by deterministic agents. A known key
//! carrying the wrong type is treated as absent rather than rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::agent_result::Probabilities;
use crate::error::ContextError;
use crate::lenient;

/// Follow `path` through nested objects (by key) and arrays (by index).
///
/// Returns `None` as soon as a segment is missing or the current value has
/// the wrong shape.
pub fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn lookup_extra<'a>(extra: &'a BTreeMap<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    lookup_path(extra.get(*first)?, rest)
}

/// Dangerous players per side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyThreats {
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub top_scorers: Vec<String>,
}

/// Numeric and statistical signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeFeatures {
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub h2h_overall_games: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub h2h_team1_wins: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub h2h_team2_wins: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub h2h_draws: Option<u32>,
    /// Home side's head-to-head win percentage (0–100).
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub h2h_team1_win_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub h2h_team1_home_wins: Option<u32>,
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub league_leader_points: Option<f64>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub home_position: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub away_position: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub home_recent_signings: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub away_recent_signings: Option<u32>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub h2h_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub standings_context: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub home_advantage_context: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub home_form: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub away_form: Option<String>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub key_threats: Option<KeyThreats>,
    /// Keys this crate does not model.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl QuantitativeFeatures {
    /// Look up a value among the unmodelled keys.
    pub fn extra_path(&self, path: &[&str]) -> Option<&Value> {
        lookup_extra(&self.extra, path)
    }

    /// Head-to-head record, from the flat keys or a raw `head_to_head` block.
    pub fn head_to_head(&self) -> Option<HeadToHead> {
        HeadToHead::from_flat(self).or_else(|| HeadToHead::from_raw(self))
    }

    /// Human-readable `key: value` lines of every present feature.
    pub fn describe(&self) -> Vec<String> {
        describe_fields(self)
    }
}

/// Narrative and contextual signals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitativeContext {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub home_venue: Option<String>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub home_capacity: Option<u32>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub away_venue: Option<String>,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub away_capacity: Option<u32>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    /// Pre-match excitement rating (0–10).
    #[serde(default, deserialize_with = "lenient::float", skip_serializing_if = "Option::is_none")]
    pub excitement_rating: Option<f64>,
    /// News headlines; a single string is read as one headline.
    #[serde(default, deserialize_with = "lenient::text_list", skip_serializing_if = "Vec::is_empty")]
    pub recent_news: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub historical_pedigree: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub referee: Option<String>,
    /// Third-party pick, e.g. "Liverpool Win".
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub ai_prediction: Option<String>,
    /// Free-form narrative (older payloads send the whole context as a string).
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl QualitativeContext {
    /// Narrative-only context.
    pub fn from_narrative(text: impl Into<String>) -> Self {
        Self {
            narrative: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn extra_path(&self, path: &[&str]) -> Option<&Value> {
        lookup_extra(&self.extra, path)
    }

    /// The home ground, preferring the specific key over the generic one.
    pub fn home_ground(&self) -> Option<&str> {
        self.home_venue.as_deref().or(self.venue.as_deref())
    }

    pub fn describe(&self) -> Vec<String> {
        describe_fields(self)
    }
}

fn describe_fields<T: Serialize>(fields: &T) -> Vec<String> {
    let Ok(Value::Object(map)) = serde_json::to_value(fields) else {
        return Vec::new();
    };
    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}: {s}"),
            other => format!("{key}: {other}"),
        })
        .collect()
}

fn qualitative_or_default<'de, D>(deserializer: D) -> Result<QualitativeContext, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) if !text.trim().is_empty() => {
            QualitativeContext::from_narrative(text.trim())
        }
        Some(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
        _ => QualitativeContext::default(),
    })
}

/// Head-to-head record from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub games: u32,
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    /// Home side's win percentage (0–100).
    pub home_win_pct: f64,
}

impl HeadToHead {
    fn from_flat(features: &QuantitativeFeatures) -> Option<Self> {
        let games = features.h2h_overall_games.filter(|g| *g > 0)?;
        let home_wins = features.h2h_team1_wins.unwrap_or(0);
        let home_win_pct = features
            .h2h_team1_win_pct
            .unwrap_or_else(|| f64::from(home_wins) * 100.0 / f64::from(games));
        Some(Self {
            games,
            home_wins,
            away_wins: features.h2h_team2_wins.unwrap_or(0),
            draws: features.h2h_draws.unwrap_or(0),
            home_win_pct,
        })
    }

    /// Read the provider's raw `head_to_head.stats.overall` block.
    fn from_raw(features: &QuantitativeFeatures) -> Option<Self> {
        let overall = features.extra_path(&["head_to_head", "stats", "overall"])?;
        let field = |key: &str| {
            lookup_path(overall, &[key])
                .and_then(lenient::as_number)
                .filter(|n| *n >= 0.0)
                .map(|n| n.round() as u32)
        };
        let games = field("overall_games_played").filter(|g| *g > 0)?;
        let home_wins = field("overall_team1_wins").unwrap_or(0);
        Some(Self {
            games,
            home_wins,
            away_wins: field("overall_team2_wins").unwrap_or(0),
            draws: field("overall_draws").unwrap_or(0),
            home_win_pct: f64::from(home_wins) * 100.0 / f64::from(games),
        })
    }
}

/// Summary of the previous debate round, shown to agents when revising.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub average_prediction: Probabilities,
    pub num_agents: usize,
    #[serde(default)]
    pub key_factors: Vec<String>,
}

/// Everything known about a fixture at prediction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    #[serde(alias = "homeTeamName", alias = "home_team_name")]
    pub home_team: String,
    #[serde(alias = "awayTeamName", alias = "away_team_name")]
    pub away_team: String,
    #[serde(
        default,
        alias = "quantitativeFeatures",
        deserialize_with = "lenient::object_or_default"
    )]
    pub quantitative_features: QuantitativeFeatures,
    #[serde(
        default,
        alias = "qualitativeContext",
        deserialize_with = "qualitative_or_default"
    )]
    pub qualitative_context: QualitativeContext,
    /// Optional estimate from an external statistical model.
    #[serde(
        default,
        deserialize_with = "lenient::object",
        skip_serializing_if = "Option::is_none"
    )]
    pub baseline_prediction: Option<Probabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_summary: Option<PeerSummary>,
}

impl MatchContext {
    /// Create a context with empty feature maps.
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Result<Self, ContextError> {
        let context = Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            quantitative_features: QuantitativeFeatures::default(),
            qualitative_context: QualitativeContext::default(),
            baseline_prediction: None,
            peer_summary: None,
        };
        context.validate()?;
        Ok(context)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        let context: Self = serde_json::from_str(json)?;
        context.validate()?;
        Ok(context)
    }

    /// Team names must be non-empty.
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.home_team.trim().is_empty() {
            return Err(ContextError::EmptyTeamName { side: "home" });
        }
        if self.away_team.trim().is_empty() {
            return Err(ContextError::EmptyTeamName { side: "away" });
        }
        Ok(())
    }

    pub fn with_quantitative(mut self, features: QuantitativeFeatures) -> Self {
        self.quantitative_features = features;
        self
    }

    pub fn with_qualitative(mut self, context: QualitativeContext) -> Self {
        self.qualitative_context = context;
        self
    }

    pub fn with_baseline(mut self, baseline: Probabilities) -> Self {
        self.baseline_prediction = Some(baseline);
        self
    }

    pub fn with_peer_summary(mut self, summary: PeerSummary) -> Self {
        self.peer_summary = Some(summary);
        self
    }

    /// `"Home vs Away"`.
    pub fn fixture(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}
