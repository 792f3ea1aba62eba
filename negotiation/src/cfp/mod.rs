//! Contract-net call for proposals
//!
//! One round of the FIPA contract-net protocol, seen from the initiator:
//!
//! ```text
//! initiator ── cfp ──────────────▶ responders
//!           ◀── propose(bid) ────  (or refuse, or failure)
//!           ── accept-proposal ──▶ best bidder
//!           ── reject-proposal ──▶ everyone else who proposed
//!           ◀── inform / failure ─ winner, once the job is done
//! ```
//!
//! Collection stops when every still-expected responder has answered or the
//! response deadline passes. Delivery failures lower the number of answers
//! expected. Evaluation (`evaluation.rs`) is pure and deterministic.

pub mod evaluation;
pub mod initiator;

use std::time::Duration;

use crate::identity::AgentId;
use crate::messaging::TransportError;

pub use evaluation::{evaluate_proposals, parse_bid, Award, Evaluation, Proposal};
pub use initiator::{ContractNetInitiator, FailureCause, ResponderFailure, ResultNotice, RoundOutcome};

/// Error type for negotiation rounds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("malformed bid from {proposer}: {content:?}")]
    MalformedBid { proposer: AgentId, content: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for negotiation operations
pub type NegotiationResult<T> = Result<T, NegotiationError>;

/// Configuration for call-for-proposal rounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfpConfig {
    /// How long to collect proposals after the cfp went out
    pub response_timeout: Duration,
    /// How long the initiator waits for the winner's result notification
    pub inform_timeout: Duration,
}

impl Default for CfpConfig {
    fn default() -> Self {
        Self {
            response_timeout: millis_from_env("CFP_RESPONSE_TIMEOUT_MS")
                .unwrap_or(Duration::from_secs(10)),
            inform_timeout: millis_from_env("CFP_INFORM_TIMEOUT_MS")
                .unwrap_or(Duration::from_secs(10)),
        }
    }
}

fn millis_from_env(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
