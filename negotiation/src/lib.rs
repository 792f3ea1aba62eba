//! Labor market negotiation core
//!
//! This library provides:
//! - Contract, work-log and settlement value types with a key-value wire codec
//! - An in-process message transport with template-based mailboxes
//! - A day/night world clock that agents subscribe to
//! - A contract-net call-for-proposal engine
//! - The technician employment lifecycle with its renewal negotiation
//!
//! # Modules
//!
//! ## Value types
//! - [`contract`]: `Contract`, `WorkFinance`, `WorkLog`, `WorkLedger`
//! - [`identity`]: agent names and the platform identity
//!
//! ## Runtime substrate
//! - [`clock`]: `WorldClock` and the `Night(d)` / `Day(d)` tick stream
//! - [`messaging`]: messages, templates, mailboxes, postman, agent context
//! - [`directory`]: yellow-pages service registration and lookup
//!
//! ## Negotiation
//! - [`cfp`]: `ContractNetInitiator` and deterministic proposal evaluation
//! - [`strategy`]: renewal policies injected into technicians
//! - [`lifecycle`]: `TechnicianLifecycle` and the employment state machine

pub mod cfp;
pub mod clock;
pub mod contract;
pub mod directory;
pub mod identity;
pub mod lifecycle;
pub mod messaging;
pub mod strategy;

// Re-export key types
pub use cfp::{
    evaluate_proposals, Award, CfpConfig, ContractNetInitiator, FailureCause, NegotiationError,
    ResponderFailure, ResultNotice, RoundOutcome,
};
pub use clock::{ClockTick, Day, Phase, SharedClock, Topic, WorldClock};
pub use contract::{Contract, ContractError, LedgerError, WorkFinance, WorkLedger, WorkLog};
pub use directory::{
    DirectoryError, ServiceDescription, ServiceDirectory, YellowPages, TECH_REPAIRS,
};
pub use identity::AgentId;
pub use lifecycle::{
    EmploymentState, LifecycleError, TechnicianLifecycle, TechnicianSnapshot, TransitionRecord,
};
pub use messaging::{
    AgentContext, AgentEvent, Message, MessageTemplate, Performative, Postman, SharedPostman,
    TransportError,
};
pub use strategy::{NegotiationStrategy, RaisePolicy, RenewalContext};
