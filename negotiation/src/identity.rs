//! Agent identities
//!
//! Every actor in the market (company, technicians, repair clients) is
//! addressed by a plain string name. The transport itself speaks as the
//! reserved `ams` identity when it reports delivery failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name used by the transport when it reports on its own behalf
const PLATFORM_NAME: &str = "ams";

/// Name of an actor taking part in the simulation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Identity of the platform, sender of "target does not exist" failures
    pub fn platform() -> Self {
        Self(PLATFORM_NAME.to_string())
    }

    pub fn is_platform(&self) -> bool {
        self.0 == PLATFORM_NAME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AgentId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
