//! Error types for the agent layer.
//!
//! Agents themselves never fail: they degrade to a neutral result. Errors
//! here cover the text-generation transport and engine assembly.

use thiserror::Error;

use crate::persona::Persona;

/// Failure talking to a text-generation endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("completion contained no text")]
    EmptyResponse,
}

impl ClientError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::ParseError(_) | Self::EmptyResponse => false,
        }
    }
}

/// Failure assembling a consensus engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("need at least {need} agents, got {got}")]
    RosterTooSmall { got: usize, need: usize },

    #[error("persona {persona} needs an LLM endpoint but none is configured")]
    GeneratorRequired { persona: Persona },

    #[error("persona {persona} has no deterministic implementation")]
    NoDeterministicAgent { persona: Persona },
}
