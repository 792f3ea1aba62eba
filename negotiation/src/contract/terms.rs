//! Employment contract terms

use serde::{Deserialize, Serialize};
use std::fmt;

use super::codec::{self, is_embeddable};
use super::ContractError;
use crate::clock::Day;
use crate::identity::AgentId;

const KEYS: [&str; 5] = ["employer", "employee", "start", "end", "salary"];

/// Terms of employment between a company and a technician.
///
/// Both `start` and `end` are inclusive: a contract `[3, 5]` is worked and
/// paid on days 3, 4 and 5, and is retired by the rollover of day 5.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ContractRecord", into = "ContractRecord")]
pub struct Contract {
    employer: AgentId,
    employee: AgentId,
    start: Day,
    end: Day,
    salary: u64,
}

impl Contract {
    pub fn new(
        employer: AgentId,
        employee: AgentId,
        start: Day,
        end: Day,
        salary: u64,
    ) -> Result<Self, ContractError> {
        if start > end {
            return Err(ContractError::InvertedTerm { start, end });
        }
        for party in [&employer, &employee] {
            if !is_embeddable(party.as_str()) {
                return Err(ContractError::InvalidParty(party.to_string()));
            }
        }
        Ok(Self {
            employer,
            employee,
            start,
            end,
            salary,
        })
    }

    pub fn employer(&self) -> &AgentId {
        &self.employer
    }

    pub fn employee(&self) -> &AgentId {
        &self.employee
    }

    pub fn start(&self) -> Day {
        self.start
    }

    pub fn end(&self) -> Day {
        self.end
    }

    pub fn salary(&self) -> u64 {
        self.salary
    }

    /// Number of days worked under this contract
    pub fn term_days(&self) -> u32 {
        (self.end - self.start).saturating_add(1)
    }

    /// Whether `day` falls inside the contract term
    pub fn covers(&self, day: Day) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether the last day of the term is `day` or earlier
    pub fn has_ended_by(&self, day: Day) -> bool {
        self.end <= day
    }

    /// A follow-up contract between the same parties.
    ///
    /// A zero-day term is widened to one day so the result always satisfies
    /// `start <= end`.
    pub fn successor(&self, start: Day, term_days: u32, salary: u64) -> Contract {
        Contract {
            employer: self.employer.clone(),
            employee: self.employee.clone(),
            start,
            end: start.saturating_add(term_days.max(1) - 1),
            salary,
        }
    }

    /// Canonical wire form, the exact inverse of [`Contract::from_payload`]
    pub fn to_payload(&self) -> String {
        codec::encode(&[
            ("employer", self.employer.to_string()),
            ("employee", self.employee.to_string()),
            ("start", self.start.to_string()),
            ("end", self.end.to_string()),
            ("salary", self.salary.to_string()),
        ])
    }

    pub fn from_payload(payload: &str) -> Result<Self, ContractError> {
        let fields = codec::decode(payload, &KEYS)?;
        Self::new(
            AgentId::new(fields.get("employer")),
            AgentId::new(fields.get("employee")),
            fields.parse("start")?,
            fields.parse("end")?,
            fields.parse("salary")?,
        )
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} employs {} on days {}..={} for {}",
            self.employer, self.employee, self.start, self.end, self.salary
        )
    }
}

/// Unchecked serde shape; conversion back into [`Contract`] re-validates
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContractRecord {
    employer: AgentId,
    employee: AgentId,
    start: Day,
    end: Day,
    salary: u64,
}

impl TryFrom<ContractRecord> for Contract {
    type Error = ContractError;

    fn try_from(record: ContractRecord) -> Result<Self, Self::Error> {
        Contract::new(
            record.employer,
            record.employee,
            record.start,
            record.end,
            record.salary,
        )
    }
}

impl From<Contract> for ContractRecord {
    fn from(contract: Contract) -> Self {
        Self {
            employer: contract.employer,
            employee: contract.employee,
            start: contract.start,
            end: contract.end,
            salary: contract.salary,
        }
    }
}
