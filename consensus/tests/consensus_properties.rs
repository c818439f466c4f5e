//! Consensus property tests: randomized validation of aggregation
//! invariants across varied rosters.
//!
//! Tests verify:
//! - The consensus always sums to 1.00 at two decimals with no negative channel
//! - Identical inputs pass through unchanged
//! - A lone agent keeps its own home and draw; away takes the remainder
//! - Zero total weight falls back to the uniform prior
//! - A missing channel behaves exactly like an explicit 0.33
//! - Agreement and spread confidence never rise as agents drift apart
//! - Aggregation is pure and repeatable

use consensus::{
    aggregate, AgentResult, AgentWeights, ConfidencePolicy, ConsensusAggregator, DebateReport,
    Outcome, Probabilities, PredictionResponse,
};

/// Small xorshift generator so every run sees the same inputs.
struct Rng(u64);

impl Rng {
    fn next_f64(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }
}

fn cents(p: &Probabilities) -> [i64; 3] {
    Outcome::ALL.map(|o| (p.get(o) * 100.0).round() as i64)
}

/// Roster of `count` agents with arbitrary values, some channels missing.
fn random_roster(rng: &mut Rng, count: usize) -> (Vec<AgentResult>, AgentWeights) {
    let mut results = Vec::with_capacity(count);
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let id = format!("agent-{i}");
        let mut result = AgentResult::new(&id, rng.next_f64(), rng.next_f64(), rng.next_f64());
        if rng.below(5) == 0 {
            *result.reported_mut(Outcome::ALL[rng.below(3)]) = None;
        }
        results.push(result.with_confidence(rng.next_f64()));
        entries.push((id, 0.1 + rng.next_f64() * 2.0));
    }
    (results, AgentWeights::new(entries).unwrap())
}

// ── Property: consensus sums to one ────────────────────────────────

#[test]
fn prop_consensus_sums_to_one() {
    let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
    for round in 0..500 {
        let count = 1 + round % 7;
        let (results, weights) = random_roster(&mut rng, count);
        let consensus = aggregate(&results, &weights);

        let c = cents(&consensus.prediction);
        assert_eq!(c.iter().sum::<i64>(), 100, "round {round}: {:?}", consensus.prediction);
        assert!(c.iter().all(|v| *v >= 0), "round {round}: {:?}", consensus.prediction);
        assert!((0.3..=1.0).contains(&consensus.confidence));
        assert!((0.0..=1.0).contains(&consensus.agreement_score));
    }
}

// ── Property: identical inputs pass through ────────────────────────

#[test]
fn prop_identical_inputs_pass_through() {
    let mut rng = Rng(42);
    for _ in 0..200 {
        let home = rng.below(101) as i64;
        let draw = rng.below((101 - home) as usize) as i64;
        let p = Probabilities::from_cents(home, draw, 100 - home - draw);

        let roster: Vec<AgentResult> = (0..1 + rng.below(5))
            .map(|i| AgentResult::from_probabilities(format!("a{i}"), p))
            .collect();
        let weights =
            AgentWeights::new(roster.iter().map(|r| (r.agent_id.clone(), 0.5 + rng.next_f64())))
                .unwrap();
        let consensus = aggregate(&roster, &weights);

        assert_eq!(cents(&consensus.prediction), cents(&p));
        assert_eq!(consensus.agreement_score, 1.0);
        assert_eq!(consensus.confidence, 1.0);
    }
}

// ── Property: a lone agent keeps its home and draw ─────────────────

#[test]
fn prop_single_agent_keeps_home_and_draw() {
    let mut rng = Rng(0xC0FFEE);
    for round in 0..300 {
        let home = rng.below(101) as i64;
        let draw = rng.below((101 - home) as usize) as i64;
        let away = rng.below(101) as i64;
        let result = AgentResult::new(
            "news_analyst",
            home as f64 / 100.0,
            draw as f64 / 100.0,
            away as f64 / 100.0,
        );
        let consensus = aggregate(&[result], &AgentWeights::standard());
        assert_eq!(
            cents(&consensus.prediction),
            [home, draw, 100 - home - draw],
            "round {round}"
        );
    }
}

// ── Property: zero weight falls back to the prior ──────────────────

#[test]
fn prop_zero_total_weight_returns_prior() {
    let mut rng = Rng(7);
    for count in 0..6 {
        let (results, _) = random_roster(&mut rng, count);
        let weights = AgentWeights::new(results.iter().map(|r| (r.agent_id.clone(), 0.0))).unwrap();
        let consensus = aggregate(&results, &weights);
        assert_eq!(consensus.prediction, Probabilities::UNIFORM_PRIOR);
        assert!(consensus.fallback_prior);
    }
}

// ── Property: missing channel equals explicit 0.33 ─────────────────

#[test]
fn prop_missing_channel_equals_explicit_default() {
    let mut rng = Rng(1234);
    for round in 0..100 {
        let (mut results, weights) = random_roster(&mut rng, 3);
        let target = round % results.len();
        let outcome = Outcome::ALL[round % 3];

        *results[target].reported_mut(outcome) = None;
        let missing = aggregate(&results, &weights);
        *results[target].reported_mut(outcome) = Some(0.33);
        let explicit = aggregate(&results, &weights);

        assert_eq!(missing, explicit, "round {round}");
    }
}

// ── Property: agreement and confidence fall with spread ────────────

#[test]
fn prop_agreement_and_confidence_monotonic_in_spread() {
    let weights = AgentWeights::empty();
    let mut last_agreement = f64::INFINITY;
    let mut last_confidence = f64::INFINITY;
    for step in 0..=50 {
        let gap = step as f64 * 0.01;
        let results = vec![
            AgentResult::new("a", 0.25, 0.5, 0.25),
            AgentResult::new("b", 0.25 + gap, 0.5 - gap, 0.25),
        ];
        let consensus = aggregate(&results, &weights);
        assert!(consensus.agreement_score <= last_agreement, "gap {gap}");
        assert!(consensus.confidence <= last_confidence, "gap {gap}");
        last_agreement = consensus.agreement_score;
        last_confidence = consensus.confidence;
    }
    assert_eq!(last_agreement, 0.0);
}

// ── Property: aggregation is pure ──────────────────────────────────

#[test]
fn prop_aggregation_is_repeatable() {
    let mut rng = Rng(99);
    for policy in [ConfidencePolicy::Spread, ConfidencePolicy::SelfReported] {
        for _ in 0..50 {
            let (results, weights) = random_roster(&mut rng, 4);
            let aggregator = ConsensusAggregator::new(weights).with_policy(policy);
            let snapshot = results.clone();
            let first = aggregator.aggregate(&results);
            let second = aggregator.aggregate(&results);
            assert_eq!(first, second);
            assert_eq!(results, snapshot);
        }
    }
}

// ── End to end ─────────────────────────────────────────────────────

#[test]
fn standard_roster_end_to_end() {
    let results = vec![
        AgentResult::new("statistician", 0.28, 0.33, 0.39).with_confidence(0.75),
        AgentResult::new("tactician", 0.35, 0.30, 0.35).with_confidence(0.6),
        AgentResult::new("sentiment_analyst", 0.35, 0.35, 0.30).with_confidence(0.5),
    ];
    let weights = AgentWeights::standard();
    let consensus = aggregate(&results, &weights);
    assert_eq!(consensus.prediction, Probabilities::new(0.32, 0.33, 0.35));
    assert_eq!(consensus.agreement_score, 0.86);
    assert_eq!(consensus.confidence, 1.0);

    let report = DebateReport::render(&results, &weights, &consensus, "Arsenal", "Chelsea");
    let response = PredictionResponse::assemble(&results, &weights, &consensus, report);
    assert_eq!(response.consensus_prediction, consensus.prediction);
    assert!(response.debate_summary.contains("Most likely: Away Win (35.00%)"));
    assert_eq!(response.agent_analyses[2].weight, 0.8);
}

#[test]
fn single_unconfigured_agent_uses_default_weight() {
    let results = vec![AgentResult::new("news_analyst", 0.5, 0.25, 0.25)];
    let consensus = aggregate(&results, &AgentWeights::standard());
    assert_eq!(consensus.prediction, Probabilities::new(0.5, 0.25, 0.25));
    assert_eq!(consensus.total_weight, 1.0);
}
