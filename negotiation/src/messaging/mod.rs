//! Agent messaging for the labor market
//!
//! This module provides the message-passing substrate every actor uses.
//!
//! # Architecture
//!
//! 1. **Messages** (`message.rs`): performative + topic + conversation id.
//!
//! 2. **Templates** (`template.rs`): predicates over topic, performative,
//!    sender and conversation used to pick messages out of a mailbox.
//!
//! 3. **Mailbox** (`mailbox.rs`): per-agent channel plus a parking queue for
//!    messages nobody has asked for yet.
//!
//! 4. **Postman** (`postman.rs`): in-process routing table; unreachable
//!    receivers bounce a platform failure to the sender.
//!
//! 5. **Context** (`context.rs`): an agent's identity, mailbox, postman and
//!    clock subscription in one place.
//!
//! # Message Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │    Sender    │────▶│   Postman    │────▶│   Mailbox    │
//! │   (send)     │     │   (route)    │     │ (receive by  │
//! └──────────────┘     └──────┬───────┘     │  template)   │
//!        ▲                    │ missing     └──────────────┘
//!        └────── failure ─────┘ receiver
//! ```

pub mod context;
pub mod mailbox;
pub mod message;
pub mod postman;
pub mod template;

use crate::identity::AgentId;

pub use context::{AgentContext, AgentEvent};
pub use mailbox::Mailbox;
pub use message::{Message, Performative};
pub use postman::{undeliverable_target, Postman, SharedPostman};
pub use template::MessageTemplate;

/// Error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("mailbox of {0} is closed")]
    MailboxClosed(AgentId),

    #[error("agent {0} already has a mailbox")]
    AlreadyRegistered(AgentId),

    #[error("simulation clock stopped")]
    ClockStopped,
}
