//! Message templates: predicates that select messages out of a mailbox

use crate::clock::Topic;
use crate::identity::AgentId;

use super::message::{Message, Performative};

/// Conjunction of optional constraints over topic, performative, sender and
/// conversation. An empty template matches every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTemplate {
    pub topic: Option<Topic>,
    pub performatives: Option<Vec<Performative>>,
    pub sender: Option<AgentId>,
    pub conversation_id: Option<String>,
}

impl MessageTemplate {
    /// Create a new empty template (matches all messages)
    pub fn any() -> Self {
        Self::default()
    }

    /// Filter by topic tag
    pub fn topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    /// Filter by a single performative
    pub fn performative(self, performative: Performative) -> Self {
        self.performatives(vec![performative])
    }

    /// Filter by any of several performatives
    pub fn performatives(mut self, performatives: Vec<Performative>) -> Self {
        self.performatives = Some(performatives);
        self
    }

    /// Filter by exact sender
    pub fn sender(mut self, sender: &AgentId) -> Self {
        self.sender = Some(sender.clone());
        self
    }

    /// Filter by conversation id
    pub fn conversation(mut self, conversation_id: &str) -> Self {
        self.conversation_id = Some(conversation_id.to_string());
        self
    }

    /// Check if a message matches this template
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(topic) = self.topic {
            if message.topic != Some(topic) {
                return false;
            }
        }

        if let Some(ref performatives) = self.performatives {
            if !performatives.contains(&message.performative) {
                return false;
            }
        }

        if let Some(ref sender) = self.sender {
            if &message.sender != sender {
                return false;
            }
        }

        if let Some(ref cid) = self.conversation_id {
            if message.conversation_id.as_deref() != Some(cid.as_str()) {
                return false;
            }
        }

        true
    }
}
