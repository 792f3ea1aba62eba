//! Renewal strategies
//!
//! A strategy decides, once per simulated day, whether a technician should
//! look for its next contract and which terms it proposes. Strategies are
//! injected into each technician's lifecycle at construction.

use serde::{Deserialize, Serialize};

use crate::clock::Day;
use crate::contract::Contract;
use crate::identity::AgentId;

/// Read-only view of a technician handed to its strategy
#[derive(Debug, Clone, Copy)]
pub struct RenewalContext<'a> {
    pub technician: &'a AgentId,
    pub company: &'a AgentId,
    pub today: Day,
    pub current: Option<&'a Contract>,
    pub next: Option<&'a Contract>,
    /// Most recently signed contract, current or not
    pub last_signed: &'a Contract,
}

/// Policy behind a technician's renewal negotiation
pub trait NegotiationStrategy: Send + Sync {
    /// Whether to negotiate a new contract today
    fn should_seek_renewal(&self, ctx: &RenewalContext<'_>) -> bool;

    /// Terms to propose to the company
    fn propose_renewal(&self, ctx: &RenewalContext<'_>) -> Contract;
}

impl<S: NegotiationStrategy + ?Sized> NegotiationStrategy for Box<S> {
    fn should_seek_renewal(&self, ctx: &RenewalContext<'_>) -> bool {
        (**self).should_seek_renewal(ctx)
    }

    fn propose_renewal(&self, ctx: &RenewalContext<'_>) -> Contract {
        (**self).propose_renewal(ctx)
    }
}

/// Ask for a fixed raise shortly before the current contract runs out.
///
/// A technician that is out of work asks right away, starting tomorrow,
/// on the terms of its last contract plus the raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisePolicy {
    /// Raise over the previous salary, in percent
    pub raise_percent: u32,
    /// Length of the proposed contract in days
    pub term_days: u32,
    /// How many days before the end of the current contract to start asking
    pub lead_days: u32,
}

impl Default for RaisePolicy {
    fn default() -> Self {
        Self {
            raise_percent: 5,
            term_days: 7,
            lead_days: 2,
        }
    }
}

impl RaisePolicy {
    fn raised(&self, salary: u64) -> u64 {
        salary.saturating_mul(100 + u64::from(self.raise_percent)) / 100
    }
}

impl NegotiationStrategy for RaisePolicy {
    fn should_seek_renewal(&self, ctx: &RenewalContext<'_>) -> bool {
        if ctx.next.is_some() {
            return false;
        }
        match ctx.current {
            Some(current) => current.end().saturating_sub(ctx.today) <= self.lead_days,
            None => true,
        }
    }

    fn propose_renewal(&self, ctx: &RenewalContext<'_>) -> Contract {
        let base = ctx.current.unwrap_or(ctx.last_signed);
        let start = ctx.today.saturating_add(1).max(base.end().saturating_add(1));
        base.successor(start, self.term_days, self.raised(base.salary()))
    }
}
