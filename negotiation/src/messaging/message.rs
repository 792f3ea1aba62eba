//! Market messages
//!
//! Messages follow the FIPA communicative-act vocabulary: a performative
//! states the intent, the topic tag states the subject, and an optional
//! conversation id ties the replies of one negotiation together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::Topic;
use crate::identity::AgentId;

/// Communicative intent of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Performative {
    /// Call for proposals
    Cfp,
    Propose,
    AcceptProposal,
    RejectProposal,
    Refuse,
    Subscribe,
    Inform,
    /// Delivery or execution failure
    Failure,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cfp => "cfp",
            Self::Propose => "propose",
            Self::AcceptProposal => "accept-proposal",
            Self::RejectProposal => "reject-proposal",
            Self::Refuse => "refuse",
            Self::Subscribe => "subscribe",
            Self::Inform => "inform",
            Self::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// A message travelling between agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub performative: Performative,
    pub sender: AgentId,
    pub receivers: Vec<AgentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(performative: Performative, sender: AgentId) -> Self {
        Self {
            performative,
            sender,
            receivers: Vec::new(),
            topic: None,
            content: String::new(),
            conversation_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Add a receiver
    pub fn to(mut self, receiver: AgentId) -> Self {
        self.receivers.push(receiver);
        self
    }

    /// Replace the receiver list
    pub fn to_all(mut self, receivers: impl IntoIterator<Item = AgentId>) -> Self {
        self.receivers = receivers.into_iter().collect();
        self
    }

    pub fn topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Reply addressed to this message's sender, in the same conversation
    /// and under the same topic
    pub fn reply(&self, performative: Performative, sender: AgentId) -> Message {
        Message {
            performative,
            sender,
            receivers: vec![self.sender.clone()],
            topic: self.topic,
            content: String::new(),
            conversation_id: self.conversation_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} from {}", self.performative, self.sender)?;
        if let Some(topic) = self.topic {
            write!(f, " on {}", topic)?;
        }
        if !self.content.is_empty() {
            write!(f, ": {}", self.content)?;
        }
        write!(f, ")")
    }
}
