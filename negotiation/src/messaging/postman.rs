//! In-process message delivery
//!
//! The postman maps agent names to their mailbox channels. Sending to a name
//! with no live mailbox bounces a `Failure` from the platform identity back
//! to the sender, the same way a remote platform reports a missing target.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::mailbox::Mailbox;
use super::message::{Message, Performative};
use super::TransportError;
use crate::identity::AgentId;

/// Content prefix of a platform notice about a missing receiver
pub const UNDELIVERABLE_PREFIX: &str = "target does not exist: ";

/// Shared reference to Postman
pub type SharedPostman = Arc<Postman>;

/// Receiver named by a platform failure notice, if `message` is one
pub fn undeliverable_target(message: &Message) -> Option<AgentId> {
    if message.performative != Performative::Failure || !message.sender.is_platform() {
        return None;
    }
    message
        .content
        .strip_prefix(UNDELIVERABLE_PREFIX)
        .map(AgentId::from)
}

/// Routing table from agent names to mailbox channels
#[derive(Default)]
pub struct Postman {
    routes: RwLock<HashMap<AgentId, mpsc::UnboundedSender<Message>>>,
}

impl Postman {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this postman
    pub fn shared(self) -> SharedPostman {
        Arc::new(self)
    }

    /// Open a mailbox for `agent`
    pub fn register(&self, agent: AgentId) -> Result<Mailbox, TransportError> {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        if routes.get(&agent).is_some_and(|tx| !tx.is_closed()) {
            return Err(TransportError::AlreadyRegistered(agent));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        routes.insert(agent.clone(), tx);
        debug!(agent = %agent, "Mailbox registered");
        Ok(Mailbox::new(agent, rx))
    }

    /// Close the route to `agent`; returns whether a route existed
    pub fn unregister(&self, agent: &AgentId) -> bool {
        let removed = self
            .routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(agent)
            .is_some();
        if removed {
            debug!(agent = %agent, "Mailbox unregistered");
        }
        removed
    }

    pub fn is_registered(&self, agent: &AgentId) -> bool {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver `message` to each receiver; returns how many got it.
    ///
    /// Every receiver that cannot be reached produces a platform failure
    /// notice for the sender. Platform notices themselves never bounce.
    pub fn send(&self, message: Message) -> usize {
        let mut delivered = 0;
        let mut unreachable = Vec::new();

        {
            let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
            for receiver in &message.receivers {
                let accepted = routes
                    .get(receiver)
                    .is_some_and(|tx| tx.send(message.clone()).is_ok());
                if accepted {
                    delivered += 1;
                } else {
                    unreachable.push(receiver.clone());
                }
            }
        }

        debug!(
            performative = %message.performative,
            sender = %message.sender,
            delivered,
            "Message sent"
        );

        if message.sender.is_platform() {
            return delivered;
        }

        for receiver in unreachable {
            warn!(
                sender = %message.sender,
                receiver = %receiver,
                performative = %message.performative,
                "Receiver does not exist, bouncing failure"
            );
            let mut notice = message
                .reply(Performative::Failure, AgentId::platform())
                .content(format!("{UNDELIVERABLE_PREFIX}{receiver}"));
            notice.receivers = vec![message.sender.clone()];
            self.send(notice);
        }

        delivered
    }
}
