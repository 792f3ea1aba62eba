//! Technician employment lifecycle
//!
//! `state.rs` holds the two-state employment machine and its transition log;
//! `technician.rs` drives it from clock ticks and company messages.

pub mod state;
pub mod technician;

use crate::clock::Day;
use crate::contract::{Contract, ContractError, LedgerError};
use crate::messaging::TransportError;

pub use state::{is_legal_transition, EmploymentMachine, EmploymentState, IllegalTransition, TransitionRecord};
pub use technician::{TechnicianLifecycle, TechnicianSnapshot};

/// Error type for lifecycle operations.
///
/// Every variant is fatal for the technician that hit it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed payload: {0}")]
    Payload(#[from] ContractError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("payment for day {paid} received while settling night {expected}")]
    WrongPaymentDay { expected: Day, paid: Day },

    #[error("granted contract names other parties: {0}")]
    ForeignContract(Contract),

    #[error("invalid renewal proposal: {0}")]
    InvalidProposal(String),

    #[error("renewal {proposal} rejected: {reason}")]
    RenewalRejected { proposal: Contract, reason: String },

    #[error("day {day} out of order (last settled night: {last_settled:?})")]
    OutOfOrder {
        day: Day,
        last_settled: Option<Day>,
    },

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;
