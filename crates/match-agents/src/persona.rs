//! Analyst personas.
//!
//! Each persona looks at the same match context through a different lens.
//! The id doubles as the key into the weights table.

use serde::{Deserialize, Serialize};

/// Analytical role of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// Quantitative: head-to-head, standings, form
    Statistician,
    /// Venue, squad changes, matchups
    Tactician,
    /// Headlines, hype and pressure
    SentimentAnalyst,
    /// Team news, injuries, morale
    NewsAnalyst,
    /// Sources of variance and upset risk
    RiskAssessor,
}

impl Persona {
    pub const ALL: [Persona; 5] = [
        Persona::Statistician,
        Persona::Tactician,
        Persona::SentimentAnalyst,
        Persona::NewsAnalyst,
        Persona::RiskAssessor,
    ];

    /// Stable id used in results and weights.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Statistician => "statistician",
            Self::Tactician => "tactician",
            Self::SentimentAnalyst => "sentiment_analyst",
            Self::NewsAnalyst => "news_analyst",
            Self::RiskAssessor => "risk_assessor",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Statistician => "The Statistician",
            Self::Tactician => "The Tactician",
            Self::SentimentAnalyst => "The Sentiment Analyst",
            Self::NewsAnalyst => "The News Analyst",
            Self::RiskAssessor => "The Risk Assessor",
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::Statistician => "Quantitative Data Analyst",
            Self::Tactician => "Tactical Analysis Expert",
            Self::SentimentAnalyst => "Market & Public Opinion Expert",
            Self::NewsAnalyst => "Media & Context Specialist",
            Self::RiskAssessor => "Uncertainty Quantification Expert",
        }
    }

    pub fn focus_areas(&self) -> &'static [&'static str] {
        match self {
            Self::Statistician => &["head-to-head record", "league standings", "recent form"],
            Self::Tactician => &["venue", "playing styles", "squad changes"],
            Self::SentimentAnalyst => &["news sentiment", "public expectation", "pressure"],
            Self::NewsAnalyst => &["team news", "injuries", "morale"],
            Self::RiskAssessor => &["uncertainty", "variance", "upset potential"],
        }
    }

    /// Whether a rule-based agent exists for this persona.
    pub fn has_deterministic(&self) -> bool {
        matches!(
            self,
            Self::Statistician | Self::Tactician | Self::SentimentAnalyst
        )
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Statistician => {
                "You are a ruthless quantitative football analyst. \
                You care only about numbers: head-to-head history, recent form, \
                league standings and goal records. Ignore narratives. \
                A home side more than five places higher in the table is a heavy favourite. \
                Respond with a single JSON object and nothing else."
            }
            Self::Tactician => {
                "You are a football tactical scout. \
                Focus on playing styles, key threats, injuries and the venue. \
                Ask whether the opponent has a counter to the main threats and whether \
                the ground is a fortress. Ignore league table positions. \
                Respond with a single JSON object and nothing else."
            }
            Self::SentimentAnalyst => {
                "You are a market and news sentiment tracker. \
                Read the qualitative context for drama, pressure or hype. \
                Fade a team whose manager was sacked or that is in crisis; \
                boost a team that recently won a major trophy or is on a winning run. \
                Respond with a single JSON object and nothing else."
            }
            Self::NewsAnalyst => {
                "You are a sports journalist weighing contextual factors. \
                Evaluate team news, injury reports, player morale and managerial pressure \
                that may not show up in the statistics. \
                Respond with a single JSON object and nothing else."
            }
            Self::RiskAssessor => {
                "You are a risk analyst specialising in uncertainty. \
                Identify sources of unpredictability, flag upset potential and keep \
                probabilities honest when the evidence is thin. \
                Respond with a single JSON object and nothing else."
            }
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|p| p.id() == normalized)
            .ok_or_else(|| format!("unknown persona: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_from_str() {
        for persona in Persona::ALL {
            assert_eq!(persona.id().parse::<Persona>(), Ok(persona));
        }
        assert_eq!("Risk-Assessor".parse::<Persona>(), Ok(Persona::RiskAssessor));
        assert!("pundit".parse::<Persona>().is_err());
    }

    #[test]
    fn test_serde_uses_ids() {
        let json = serde_json::to_string(&Persona::SentimentAnalyst).unwrap();
        assert_eq!(json, "\"sentiment_analyst\"");
    }

    #[test]
    fn test_deterministic_coverage() {
        let covered: Vec<_> = Persona::ALL
            .into_iter()
            .filter(Persona::has_deterministic)
            .collect();
        assert_eq!(
            covered,
            vec![
                Persona::Statistician,
                Persona::Tactician,
                Persona::SentimentAnalyst
            ]
        );
    }
}
