//! Engine integration tests: roster assembly, concurrent rounds, failure
//! injection and the LLM path, all with in-process mocks. No inference
//! endpoint required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use consensus::{AgentResult, AgentWeights, ConsensusAggregator, MatchContext, Probabilities};
use match_agents::{
    Agent, AgentFactory, AgentSpec, ClientError, ConsensusEngine, EngineConfig, EngineError,
    EngineOptions, LlmConfig, Persona, PredictorConfig, TextGenerator,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Always answers the same triple, optionally after a delay.
struct FixedAgent {
    id: String,
    prediction: Probabilities,
    confidence: f64,
    delay: Duration,
}

impl FixedAgent {
    fn new(id: &str, home: f64, draw: f64, away: f64) -> Self {
        Self {
            id: id.to_string(),
            prediction: Probabilities::new(home, draw, away),
            confidence: 0.6,
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

#[async_trait]
impl Agent for FixedAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn analyze(&self, _context: &MatchContext) -> AgentResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        AgentResult::from_probabilities(&self.id, self.prediction).with_confidence(self.confidence)
    }
}

/// Changes its answer once it sees a peer summary.
struct RevisingAgent {
    id: String,
}

#[async_trait]
impl Agent for RevisingAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn analyze(&self, context: &MatchContext) -> AgentResult {
        match &context.peer_summary {
            None => AgentResult::new(&self.id, 0.6, 0.2, 0.2),
            Some(peers) => AgentResult::new(&self.id, 0.4, 0.3, 0.3)
                .with_reasoning(format!("Saw {} peers", peers.num_agents)),
        }
    }
}

struct PanickingAgent;

#[async_trait]
impl Agent for PanickingAgent {
    fn id(&self) -> &str {
        "risk_assessor"
    }

    async fn analyze(&self, _context: &MatchContext) -> AgentResult {
        panic!("model weights missing");
    }
}

/// Canned completion text; records every user prompt.
struct MockGenerator {
    reply: Result<String, u16>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, _system: &str, user: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ClientError::Status {
                status: *status,
                body: "overloaded".into(),
            }),
        }
    }
}

fn context() -> MatchContext {
    MatchContext::new("Manchester City", "West Ham").unwrap()
}

fn standard_engine(agents: Vec<Arc<dyn Agent>>, options: EngineOptions) -> ConsensusEngine {
    ConsensusEngine::new(
        agents,
        ConsensusAggregator::new(AgentWeights::standard()),
        options,
    )
    .unwrap()
}

fn offline_config(agents: Vec<AgentSpec>) -> PredictorConfig {
    PredictorConfig {
        llm: LlmConfig::from_lookup(|_| None),
        engine: EngineConfig::from_lookup(|_| None),
        weights: AgentWeights::standard(),
        agents,
    }
}

// ── Construction ─────────────────────────────────────────────────────────────

#[test]
fn roster_below_minimum_is_rejected() {
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(FixedAgent::new("statistician", 0.5, 0.3, 0.2)),
        Arc::new(FixedAgent::new("tactician", 0.5, 0.3, 0.2)),
    ];
    let err = ConsensusEngine::new(
        agents,
        ConsensusAggregator::new(AgentWeights::standard()),
        EngineOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::RosterTooSmall { got: 2, need: 3 }));
}

#[test]
fn llm_roster_without_generator_is_rejected() {
    let config = offline_config(vec![
        AgentSpec::deterministic(Persona::Statistician),
        AgentSpec::deterministic(Persona::Tactician),
        AgentSpec::llm(Persona::NewsAnalyst),
    ]);
    let err = ConsensusEngine::from_config(&config, &AgentFactory::deterministic()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::GeneratorRequired {
            persona: Persona::NewsAnalyst
        }
    ));
}

// ── Single round ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn standard_scenario_through_engine() {
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(FixedAgent::new("statistician", 0.28, 0.33, 0.39).with_confidence(0.75)),
        Arc::new(FixedAgent::new("tactician", 0.35, 0.30, 0.35)),
        Arc::new(FixedAgent::new("sentiment_analyst", 0.35, 0.35, 0.30).with_confidence(0.5)),
    ];
    let engine = standard_engine(agents, EngineOptions::default());

    let response = engine.run(&context()).await;
    assert_eq!(
        response.consensus_prediction,
        Probabilities::new(0.32, 0.33, 0.35)
    );
    assert_eq!(response.agreement_score, 0.86);
    assert_eq!(response.confidence, 1.0);
    assert!(response
        .debate_summary
        .contains("DEBATE SUMMARY: Manchester City vs West Ham"));
    assert!(response
        .debate_summary
        .contains("Most likely: Away Win (35.00%)"));
}

#[tokio::test(start_paused = true)]
async fn results_keep_roster_order_regardless_of_finish_order() {
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(
            FixedAgent::new("statistician", 0.5, 0.3, 0.2).with_delay(Duration::from_millis(300)),
        ),
        Arc::new(
            FixedAgent::new("tactician", 0.4, 0.3, 0.3).with_delay(Duration::from_millis(200)),
        ),
        Arc::new(
            FixedAgent::new("sentiment_analyst", 0.3, 0.3, 0.4)
                .with_delay(Duration::from_millis(100)),
        ),
    ];
    let engine = standard_engine(agents, EngineOptions::default());

    let response = engine.run(&context()).await;
    let ids: Vec<_> = response
        .agent_analyses
        .iter()
        .map(|a| a.agent.as_str())
        .collect();
    assert_eq!(ids, vec!["statistician", "tactician", "sentiment_analyst"]);
}

#[tokio::test]
async fn panicked_agent_becomes_neutral() {
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(FixedAgent::new("statistician", 0.5, 0.3, 0.2)),
        Arc::new(PanickingAgent),
        Arc::new(FixedAgent::new("tactician", 0.5, 0.3, 0.2)),
    ];
    let engine = standard_engine(agents, EngineOptions::default());

    let results = engine.debate(&context()).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[1].agent_id, "risk_assessor");
    assert_eq!(results[1].probabilities(), Probabilities::UNIFORM_PRIOR);
    assert_eq!(results[1].confidence, Some(0.0));
    assert!(results[1].reasoning.contains("agent task failed"));
}

#[tokio::test(start_paused = true)]
async fn slow_agent_times_out_to_neutral() {
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(FixedAgent::new("statistician", 0.5, 0.3, 0.2)),
        Arc::new(
            FixedAgent::new("tactician", 0.5, 0.3, 0.2).with_delay(Duration::from_secs(600)),
        ),
        Arc::new(FixedAgent::new("sentiment_analyst", 0.5, 0.3, 0.2)),
    ];
    let options = EngineOptions::default().with_agent_timeout(Duration::from_secs(5));
    let engine = standard_engine(agents, options);

    let results = engine.debate(&context()).await;
    assert_eq!(results[0].probabilities(), Probabilities::new(0.5, 0.3, 0.2));
    assert_eq!(results[1].probabilities(), Probabilities::UNIFORM_PRIOR);
    assert!(results[1].reasoning.contains("timed out"));
}

#[tokio::test]
async fn deterministic_roster_runs_offline() {
    let engine = ConsensusEngine::from_config(
        &offline_config(AgentSpec::standard_roster()),
        &AgentFactory::deterministic(),
    )
    .unwrap();
    let context = MatchContext::from_json(
        r#"{
            "home_team": "Manchester City",
            "away_team": "West Ham",
            "quantitative_features": {
                "h2h_overall_games": 24,
                "h2h_team1_wins": 13,
                "h2h_team2_wins": 5,
                "h2h_draws": 6
            },
            "qualitative_context": {
                "home_venue": "Etihad Stadium",
                "home_capacity": 55097,
                "recent_news": ["West Ham unbeaten in five"]
            }
        }"#,
    )
    .unwrap();

    let response = engine.run(&context).await;
    let p = response.consensus_prediction;
    assert!((p.sum() - 1.0).abs() < 1e-9);
    assert_eq!(response.agent_analyses.len(), 3);
    assert!(p.home_win > p.away_win);
}

// ── Debate rounds ────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_round_blends_with_first() {
    let agents: Vec<Arc<dyn Agent>> = ["statistician", "tactician", "sentiment_analyst"]
        .into_iter()
        .map(|id| Arc::new(RevisingAgent { id: id.to_string() }) as Arc<dyn Agent>)
        .collect();
    let engine = standard_engine(agents, EngineOptions::default().with_rounds(2));

    let results = engine.debate(&context()).await;
    for result in &results {
        assert!((result.home_win.unwrap() - 0.46).abs() < 1e-9);
        assert!((result.draw.unwrap() - 0.27).abs() < 1e-9);
        assert!((result.away_win.unwrap() - 0.27).abs() < 1e-9);
        assert_eq!(result.reasoning, "Saw 3 peers");
    }

    let response = engine.run(&context()).await;
    assert_eq!(
        response.consensus_prediction,
        Probabilities::new(0.46, 0.27, 0.27)
    );
}

// ── LLM path ─────────────────────────────────────────────────────────────────

fn llm_roster() -> Vec<AgentSpec> {
    vec![
        AgentSpec::llm(Persona::Tactician),
        AgentSpec::llm(Persona::NewsAnalyst),
        AgentSpec::llm(Persona::RiskAssessor),
    ]
}

#[tokio::test]
async fn llm_roster_parses_percent_replies() {
    let generator = MockGenerator::replying(
        r#"Here is my view: {"home_win_probability": 45, "draw_probability": 30,
            "away_win_probability": 25, "confidence": 70,
            "reasoning": "Hosts stronger at home", "key_factors": ["Home form"]}"#,
    );
    let factory = AgentFactory::with_generator(generator.clone());
    let engine = ConsensusEngine::from_config(&offline_config(llm_roster()), &factory).unwrap();

    let response = engine.run(&context()).await;
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        response.consensus_prediction,
        Probabilities::new(0.45, 0.30, 0.25)
    );
    assert_eq!(response.agent_analyses[1].agent, "news_analyst");
    assert_eq!(response.agent_analyses[1].confidence, 0.7);
    assert_eq!(response.report.common_factors, vec!["Home form"]);
}

#[tokio::test]
async fn llm_second_round_prompts_carry_peer_summary() {
    let generator = MockGenerator::replying(r#"{"home_win": 0.5, "draw": 0.25, "away_win": 0.25}"#);
    let factory = AgentFactory::with_generator(generator.clone());
    let mut config = offline_config(llm_roster());
    config.engine.rounds = 2;
    let engine = ConsensusEngine::from_config(&config, &factory).unwrap();

    engine.run(&context()).await;
    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 6);
    let with_peers = prompts
        .iter()
        .filter(|p| p.contains("Peer Analyses (previous round, 3 agents)"))
        .count();
    assert_eq!(with_peers, 3);
}

#[tokio::test]
async fn llm_failures_degrade_to_prior() {
    let generator = MockGenerator::failing(503);
    let factory = AgentFactory::with_generator(generator);
    let engine = ConsensusEngine::from_config(&offline_config(llm_roster()), &factory).unwrap();

    let response = engine.run(&context()).await;
    assert_eq!(response.consensus_prediction, Probabilities::UNIFORM_PRIOR);
    assert_eq!(response.confidence, 0.3);
    assert_eq!(response.agreement_score, 0.0);
    assert!(response.report.consensus.degraded);
    assert!(response
        .debate_summary
        .contains("Confidence: 30.00% | Agreement: 0.00 (Low)"));
    for analysis in &response.agent_analyses {
        assert_eq!(analysis.confidence, 0.0);
        assert!(analysis.reasoning.starts_with("Analysis unavailable"));
    }
}
