//! Service directory ("yellow pages")
//!
//! Technicians advertise the repair skill they offer under the
//! `tech-repairs` service type; repair clients look providers up here before
//! opening a call for proposals.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;

use crate::identity::AgentId;

/// Service type under which technicians advertise repair skills
pub const TECH_REPAIRS: &str = "tech-repairs";

/// Error type for directory operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("agent {0} is already registered")]
    AlreadyRegistered(AgentId),

    #[error("agent {0} is not registered")]
    NotRegistered(AgentId),
}

/// One advertised service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    /// Offered skill, e.g. "plumbing"
    pub name: String,
    pub service_type: String,
}

impl ServiceDescription {
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
        }
    }

    /// A repair skill advertised under [`TECH_REPAIRS`]
    pub fn repairs(skill: impl Into<String>) -> Self {
        Self::new(skill, TECH_REPAIRS)
    }
}

/// Registration and lookup of advertised services
pub trait ServiceDirectory: Send + Sync {
    fn register(&self, agent: &AgentId, service: ServiceDescription)
        -> Result<(), DirectoryError>;

    fn deregister(&self, agent: &AgentId) -> Result<(), DirectoryError>;

    /// Providers of `service_type`, in registration order
    fn search(&self, service_type: &str) -> Vec<AgentId>;
}

/// In-memory directory
#[derive(Default)]
pub struct YellowPages {
    entries: RwLock<Vec<(AgentId, ServiceDescription)>>,
}

impl YellowPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ServiceDirectory for YellowPages {
    fn register(
        &self,
        agent: &AgentId,
        service: ServiceDescription,
    ) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|(id, _)| id == agent) {
            return Err(DirectoryError::AlreadyRegistered(agent.clone()));
        }

        info!(
            agent = %agent,
            service = %service.name,
            service_type = %service.service_type,
            "Registering service"
        );
        entries.push((agent.clone(), service));
        Ok(())
    }

    fn deregister(&self, agent: &AgentId) -> Result<(), DirectoryError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|(id, _)| id != agent);
        if entries.len() == before {
            return Err(DirectoryError::NotRegistered(agent.clone()));
        }
        info!(agent = %agent, "Service deregistered");
        Ok(())
    }

    fn search(&self, service_type: &str) -> Vec<AgentId> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, service)| service.service_type == service_type)
            .map(|(id, _)| id.clone())
            .collect()
    }
}
