//! Consensus engine: fan the match context out to every agent, optionally
//! run revision rounds with a peer summary, then aggregate and report.
//!
//! ```text
//! Round 1:    JoinSet::spawn(agent_i.analyze(ctx)) × N, semaphore-bounded
//! Round 2..N: ctx + PeerSummary(prev) ─► agents ─► blend 0.7·new + 0.3·prev
//! Finish:     aggregate ─► DebateReport ─► PredictionResponse
//! ```
//!
//! ## Partial failure policy
//!
//! A panicked or timed-out agent contributes [`AgentResult::neutral`] in its
//! roster slot. Results are always returned in roster order.

use std::sync::Arc;
use std::time::Duration;

use consensus::{
    common_factors, round_to, AgentResult, ConsensusAggregator, DebateReport, MatchContext,
    Outcome, PeerSummary, PredictionResponse, Probabilities,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agents::{Agent, AgentFactory};
use crate::config::PredictorConfig;
use crate::error::EngineError;

/// Weight of a revised answer against the agent's previous one.
const REVISION_WEIGHT: f64 = 0.7;

/// Debate execution settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Total rounds, at least 1.
    pub rounds: u32,
    pub min_agents: usize,
    pub max_concurrency: usize,
    pub agent_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rounds: 1,
            min_agents: 3,
            max_concurrency: 4,
            agent_timeout: None,
        }
    }
}

impl EngineOptions {
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    pub fn with_min_agents(mut self, min_agents: usize) -> Self {
        self.min_agents = min_agents;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }
}

pub struct ConsensusEngine {
    agents: Vec<Arc<dyn Agent>>,
    aggregator: ConsensusAggregator,
    options: EngineOptions,
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("agents", &self.agent_ids())
            .field("options", &self.options)
            .finish()
    }
}

impl ConsensusEngine {
    pub fn new(
        agents: Vec<Arc<dyn Agent>>,
        aggregator: ConsensusAggregator,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        if agents.len() < options.min_agents {
            return Err(EngineError::RosterTooSmall {
                got: agents.len(),
                need: options.min_agents,
            });
        }
        Ok(Self {
            agents,
            aggregator,
            options,
        })
    }

    /// Build the roster, weights and options from configuration.
    pub fn from_config(
        config: &PredictorConfig,
        factory: &AgentFactory,
    ) -> Result<Self, EngineError> {
        let agents = factory.build_roster(&config.agents)?;
        let aggregator =
            ConsensusAggregator::new(config.weights.clone()).with_policy(config.engine.policy);
        Self::new(agents, aggregator, config.engine_options())
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id()).collect()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Run the full debate for one match.
    pub async fn run(&self, context: &MatchContext) -> PredictionResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!("consensus_run", %request_id, fixture = %context.fixture());

        async move {
            info!(
                agents = self.agents.len(),
                rounds = self.options.rounds,
                "Starting consensus run"
            );
            let results = self.debate(context).await;
            let consensus = self.aggregator.aggregate(&results);
            let report = DebateReport::render(
                &results,
                self.aggregator.weights(),
                &consensus,
                &context.home_team,
                &context.away_team,
            );
            info!(
                home = consensus.prediction.home_win,
                draw = consensus.prediction.draw,
                away = consensus.prediction.away_win,
                confidence = consensus.confidence,
                agreement = consensus.agreement_score,
                fallback = consensus.fallback_prior,
                degraded = consensus.degraded,
                "Consensus reached"
            );
            PredictionResponse::assemble(&results, self.aggregator.weights(), &consensus, report)
        }
        .instrument(span)
        .await
    }

    /// All rounds; returns the final per-agent results in roster order.
    pub async fn debate(&self, context: &MatchContext) -> Vec<AgentResult> {
        let mut results = self.run_round(Arc::new(context.clone())).await;

        for round in 2..=self.options.rounds {
            let summary = peer_summary(&results);
            debug!(
                round,
                home = summary.average_prediction.home_win,
                draw = summary.average_prediction.draw,
                away = summary.average_prediction.away_win,
                "Peer summary"
            );
            let revised_context = Arc::new(context.clone().with_peer_summary(summary));
            let revised = self.run_round(revised_context).await;
            results = revised
                .into_iter()
                .zip(&results)
                .map(|(new, previous)| blend(new, previous))
                .collect();
        }

        results
    }

    async fn run_round(&self, context: Arc<MatchContext>) -> Vec<AgentResult> {
        let sem = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut join_set: JoinSet<(usize, AgentResult)> = JoinSet::new();

        for (index, agent) in self.agents.iter().enumerate() {
            let sem = sem.clone();
            let agent = agent.clone();
            let context = context.clone();
            let timeout = self.options.agent_timeout;

            join_set.spawn(
                async move {
                    // The semaphore is never closed; a failed acquire just runs unbounded.
                    let _permit = sem.acquire().await.ok();
                    (index, analyze_within(agent.as_ref(), &context, timeout).await)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<AgentResult>> = vec![None; self.agents.len()];
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((index, result)) => {
                    debug!(
                        agent = %result.agent_id,
                        home = ?result.home_win,
                        draw = ?result.draw,
                        away = ?result.away_win,
                        confidence = ?result.confidence,
                        "Agent finished"
                    );
                    slots[index] = Some(result);
                }
                Err(e) => {
                    warn!(error = %e, "Agent task panicked");
                }
            }
        }

        slots
            .into_iter()
            .zip(&self.agents)
            .map(|(slot, agent)| {
                slot.unwrap_or_else(|| {
                    AgentResult::neutral(agent.id(), "Analysis unavailable: agent task failed")
                })
            })
            .collect()
    }
}

async fn analyze_within(
    agent: &dyn Agent,
    context: &MatchContext,
    timeout: Option<Duration>,
) -> AgentResult {
    let Some(limit) = timeout else {
        return agent.analyze(context).await;
    };
    match tokio::time::timeout(limit, agent.analyze(context)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(agent = agent.id(), ?limit, "Agent timed out");
            AgentResult::neutral(
                agent.id(),
                format!("Analysis unavailable: timed out after {limit:?}"),
            )
        }
    }
}

/// Channel means of the previous round, plus the factors agents share.
pub fn peer_summary(results: &[AgentResult]) -> PeerSummary {
    let n = results.len().max(1) as f64;
    let mean = |outcome: Outcome| {
        round_to(
            results.iter().map(|r| r.value(outcome)).sum::<f64>() / n,
            3,
        )
    };
    PeerSummary {
        average_prediction: Probabilities::new(
            mean(Outcome::Home),
            mean(Outcome::Draw),
            mean(Outcome::Away),
        ),
        num_agents: results.len(),
        key_factors: common_factors(results),
    }
}

/// Pull a revised answer toward the previous one. Channels the revision
/// leaves out stay missing.
pub fn blend(mut new: AgentResult, previous: &AgentResult) -> AgentResult {
    for outcome in Outcome::ALL {
        let prior = previous.value(outcome);
        if let Some(value) = new.reported_mut(outcome) {
            *value = REVISION_WEIGHT * *value + (1.0 - REVISION_WEIGHT) * prior;
        }
    }
    new
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_summary_means_and_shared_factors() {
        let results = vec![
            AgentResult::new("a", 0.5, 0.3, 0.2).with_key_factors(vec!["Home form".into()]),
            AgentResult::new("b", 0.4, 0.3, 0.3).with_key_factors(vec!["home form".into()]),
            AgentResult::empty("c"),
        ];
        let summary = peer_summary(&results);
        assert_eq!(summary.num_agents, 3);
        assert_eq!(summary.average_prediction, Probabilities::new(0.41, 0.31, 0.277));
        assert_eq!(summary.key_factors, vec!["Home form"]);
    }

    #[test]
    fn test_blend_keeps_missing_channels_missing() {
        let previous = AgentResult::new("a", 0.6, 0.2, 0.2);
        let mut revised = AgentResult::new("a", 0.4, 0.3, 0.3);
        revised.away_win = None;

        let blended = blend(revised, &previous);
        assert!((blended.home_win.unwrap() - 0.46).abs() < 1e-12);
        assert!((blended.draw.unwrap() - 0.27).abs() < 1e-12);
        assert_eq!(blended.away_win, None);
    }

    #[test]
    fn test_options_builders() {
        let options = EngineOptions::default()
            .with_rounds(0)
            .with_min_agents(1)
            .with_agent_timeout(Duration::from_secs(5));
        assert_eq!(options.rounds, 1);
        assert_eq!(options.min_agents, 1);
        assert_eq!(options.agent_timeout, Some(Duration::from_secs(5)));
    }
}
