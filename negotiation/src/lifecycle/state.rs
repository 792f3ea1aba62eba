//! Employment state and legal transition guards.
//!
//! A technician is either out of work or working under a current contract.
//! Every change between the two is checked against the transition table and
//! recorded with the simulated day it happened on, so a run can be replayed
//! from the log.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Day;

/// Employment state of one technician
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentState {
    /// No current contract
    Unemployed,
    /// Holding a current contract
    Working,
}

impl fmt::Display for EmploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unemployed => write!(f, "Unemployed"),
            Self::Working => write!(f, "Working"),
        }
    }
}

/// Legal transitions between employment states.
///
/// ```text
/// Unemployed → Working     (hired, or a pending contract starts)
/// Working    → Unemployed  (contract ended with nothing to follow)
/// ```
pub fn is_legal_transition(from: EmploymentState, to: EmploymentState) -> bool {
    use EmploymentState::*;

    matches!((from, to), (Unemployed, Working) | (Working, Unemployed))
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: EmploymentState,
    pub to: EmploymentState,
    /// Simulated day the transition happened on
    pub day: Day,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal employment transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: EmploymentState,
    pub to: EmploymentState,
}

/// Employment state plus its transition log
#[derive(Debug, Clone)]
pub struct EmploymentMachine {
    current: EmploymentState,
    transitions: Vec<TransitionRecord>,
}

impl EmploymentMachine {
    /// Start out of work
    pub fn new() -> Self {
        Self {
            current: EmploymentState::Unemployed,
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> EmploymentState {
        self.current
    }

    /// Move to `to` on `day`.
    ///
    /// Returns `Err(IllegalTransition)` for anything outside the table,
    /// including a self-transition.
    pub fn advance(
        &mut self,
        to: EmploymentState,
        day: Day,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, day, "Employment transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            day,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    /// Move to `to` unless already there; returns whether a transition was recorded
    pub fn settle(
        &mut self,
        to: EmploymentState,
        day: Day,
        reason: Option<&str>,
    ) -> Result<bool, IllegalTransition> {
        if self.current == to {
            return Ok(false);
        }
        self.advance(to, day, reason).map(|()| true)
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// One-line history, e.g. `Unemployed → Working (3 transitions) [Working@0 → ...]`
    pub fn summary(&self) -> String {
        let steps: Vec<String> = self
            .transitions
            .iter()
            .map(|t| format!("{}@{}", t.to, t.day))
            .collect();
        let mut summary = format!(
            "{} → {} ({} transitions)",
            EmploymentState::Unemployed,
            self.current,
            self.transitions.len()
        );
        if !steps.is_empty() {
            summary.push_str(&format!(" [{}]", steps.join(" → ")));
        }
        summary
    }
}

impl Default for EmploymentMachine {
    fn default() -> Self {
        Self::new()
    }
}
