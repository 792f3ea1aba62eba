//! Contract value types
//!
//! Immutable records exchanged between technicians and their company:
//!
//! - [`Contract`]: negotiated terms, carried on the wire as a key-value payload
//! - [`WorkFinance`]: the salary paid for one night's settlement
//! - [`WorkLog`] / [`WorkLedger`]: the per-day work history of a technician

mod codec;
pub mod terms;
pub mod work_log;

use crate::clock::Day;

pub use terms::Contract;
pub use work_log::{LedgerError, WorkFinance, WorkLedger, WorkLog};

/// Error type for contract construction and payload parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("contract starts on day {start} but ends on day {end}")]
    InvertedTerm { start: Day, end: Day },

    #[error("party name {0:?} is empty or contains ';' or '='")]
    InvalidParty(String),

    #[error("malformed payload {payload:?}: {reason}")]
    MalformedPayload { payload: String, reason: String },
}
