//! Match Consensus Core
//!
//! Deterministic building blocks for multi-agent match prediction:
//! - Typed match context records handed to every agent
//! - Agent results with a forgiving missing-field contract
//! - Static per-agent reliability weights
//! - Weighted consensus with exact sum-to-one rounding, spread-based
//!   confidence and an agreement score
//! - Debate summaries as structured data and as plain text
//!
//! # Pipeline
//!
//! ```text
//! MatchContext ──► agents (match-agents crate) ──► Vec<AgentResult>
//!                                                        │
//!                      AgentWeights ──► ConsensusAggregator::aggregate
//!                                                        │
//!                                                        ▼
//!                                                 ConsensusResult
//!                                                        │
//!                                  DebateReport::render ─┤
//!                                                        ▼
//!                                             PredictionResponse
//! ```
//!
//! # Usage
//!
//! ```
//! use consensus::{AgentResult, AgentWeights, ConsensusAggregator};
//!
//! let results = vec![
//!     AgentResult::new("statistician", 0.28, 0.33, 0.39),
//!     AgentResult::new("tactician", 0.35, 0.30, 0.35),
//!     AgentResult::new("sentiment_analyst", 0.35, 0.35, 0.30),
//! ];
//! let consensus = ConsensusAggregator::new(AgentWeights::standard()).aggregate(&results);
//! assert_eq!(consensus.prediction.home_win, 0.32);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod agent_result;
pub mod aggregator;
pub mod context;
pub mod error;
mod lenient;
pub mod response;
pub mod summary;
pub mod weights;

pub use agent_result::{AgentResult, Outcome, Probabilities, MISSING_PROBABILITY};
pub use aggregator::{
    aggregate, round_to, AgreementLevel, ConfidencePolicy, ConsensusAggregator, ConsensusResult,
};
pub use context::{
    lookup_path, HeadToHead, KeyThreats, MatchContext, PeerSummary, QualitativeContext,
    QuantitativeFeatures,
};
pub use error::{ConfigError, ContextError};
pub use lenient::as_number;
pub use response::{AgentAnalysis, PredictionResponse};
pub use summary::{
    common_factors, wrap_text, AgentBlock, ConsensusBlock, DebateReport, WeightedContribution,
    REASONING_WRAP_WIDTH,
};
pub use weights::{AgentWeights, DEFAULT_WEIGHT};
