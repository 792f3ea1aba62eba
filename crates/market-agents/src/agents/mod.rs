//! Market actors
//!
//! Each actor owns its [`AgentContext`](negotiation::AgentContext) and runs
//! as its own tokio task:
//!
//! - [`company::Company`]: hires, pays and renews
//! - [`technician::TechnicianAgent`]: lifecycle plus repair bidding
//! - [`client::RepairClient`]: periodic repair calls for proposals

pub mod client;
pub mod company;
pub mod technician;

use negotiation::{AgentId, Day, DirectoryError, LifecycleError, NegotiationError, Phase, TransportError};

pub use client::{RepairClient, RepairRound};
pub use company::{Company, CompanyReport, HiringTerms};
pub use technician::TechnicianAgent;

/// Error that ends one actor
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("lifecycle: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("directory: {0}")]
    Directory(#[from] DirectoryError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("negotiation: {0}")]
    Negotiation(#[from] NegotiationError),
}

/// A technician finished handling one clock tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickAck {
    pub agent: AgentId,
    pub day: Day,
    pub phase: Phase,
}
