//! Daily settlement records and the per-technician work ledger

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::codec;
use super::{Contract, ContractError};
use crate::clock::Day;

const FINANCE_KEYS: [&str; 2] = ["day", "salary"];

/// Error type for ledger operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("day {day}: paid {paid} but the contract salary is {contracted}")]
    SalaryMismatch { day: Day, contracted: u64, paid: u64 },

    #[error("day {day} is outside the contract term {start}..={end}")]
    OutsideTerm { day: Day, start: Day, end: Day },

    #[error("a work log for day {0} already exists")]
    DuplicateDay(Day),
}

/// Salary actually paid for one day of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkFinance {
    pub day: Day,
    pub salary: u64,
}

impl WorkFinance {
    pub fn new(day: Day, salary: u64) -> Self {
        Self { day, salary }
    }

    pub fn to_payload(&self) -> String {
        codec::encode(&[
            ("day", self.day.to_string()),
            ("salary", self.salary.to_string()),
        ])
    }

    pub fn from_payload(payload: &str) -> Result<Self, ContractError> {
        let fields = codec::decode(payload, &FINANCE_KEYS)?;
        Ok(Self {
            day: fields.parse("day")?,
            salary: fields.parse("salary")?,
        })
    }
}

/// What happened to a technician on one simulated day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLog {
    day: Day,
    contract: Option<Contract>,
    finance: Option<WorkFinance>,
}

impl WorkLog {
    /// A day spent without a contract
    pub fn idle(day: Day) -> Self {
        Self {
            day,
            contract: None,
            finance: None,
        }
    }

    /// A day worked under `contract` and settled by `finance`.
    ///
    /// The payment must fall inside the contract term and match its salary
    /// exactly.
    pub fn worked(contract: Contract, finance: WorkFinance) -> Result<Self, LedgerError> {
        if !contract.covers(finance.day) {
            return Err(LedgerError::OutsideTerm {
                day: finance.day,
                start: contract.start(),
                end: contract.end(),
            });
        }
        if finance.salary != contract.salary() {
            return Err(LedgerError::SalaryMismatch {
                day: finance.day,
                contracted: contract.salary(),
                paid: finance.salary,
            });
        }
        Ok(Self {
            day: finance.day,
            contract: Some(contract),
            finance: Some(finance),
        })
    }

    pub fn day(&self) -> Day {
        self.day
    }

    pub fn contract(&self) -> Option<&Contract> {
        self.contract.as_ref()
    }

    pub fn finance(&self) -> Option<&WorkFinance> {
        self.finance.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.contract.is_none()
    }
}

/// Append-only history of work logs, at most one per day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkLedger {
    logs: BTreeMap<Day, WorkLog>,
}

impl WorkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a day; an existing entry for the same day is never replaced
    pub fn record(&mut self, log: WorkLog) -> Result<(), LedgerError> {
        if self.logs.contains_key(&log.day) {
            return Err(LedgerError::DuplicateDay(log.day));
        }
        self.logs.insert(log.day, log);
        Ok(())
    }

    pub fn get(&self, day: Day) -> Option<&WorkLog> {
        self.logs.get(&day)
    }

    pub fn contains(&self, day: Day) -> bool {
        self.logs.contains_key(&day)
    }

    /// Logs in day order
    pub fn iter(&self) -> impl Iterator<Item = &WorkLog> {
        self.logs.values()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn days_worked(&self) -> usize {
        self.logs.values().filter(|log| !log.is_idle()).count()
    }

    pub fn total_earned(&self) -> u64 {
        self.logs
            .values()
            .filter_map(|log| log.finance.map(|f| f.salary))
            .fold(0u64, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(salary: u64) -> Contract {
        Contract::new("company".into(), "tech-1".into(), 0, 9, salary).unwrap()
    }

    #[test]
    fn test_idle_log_has_no_contract_or_finance() {
        let log = WorkLog::idle(4);
        assert!(log.is_idle());
        assert!(log.contract().is_none());
        assert!(log.finance().is_none());
    }

    #[test]
    fn test_worked_log_cross_checks_salary() {
        let log = WorkLog::worked(contract(100), WorkFinance::new(2, 100)).unwrap();
        assert_eq!(log.day(), 2);
        assert_eq!(
            log.finance().unwrap().salary,
            log.contract().unwrap().salary()
        );

        let err = WorkLog::worked(contract(100), WorkFinance::new(2, 99)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::SalaryMismatch {
                day: 2,
                contracted: 100,
                paid: 99
            }
        );
    }

    #[test]
    fn test_worked_log_rejects_day_outside_term() {
        let err = WorkLog::worked(contract(100), WorkFinance::new(10, 100)).unwrap_err();
        assert!(matches!(err, LedgerError::OutsideTerm { day: 10, .. }));
    }

    #[test]
    fn test_ledger_keeps_one_log_per_day() {
        let mut ledger = WorkLedger::new();
        ledger.record(WorkLog::idle(0)).unwrap();
        ledger
            .record(WorkLog::worked(contract(50), WorkFinance::new(1, 50)).unwrap())
            .unwrap();

        let err = ledger
            .record(WorkLog::worked(contract(50), WorkFinance::new(0, 50)).unwrap())
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateDay(0));
        assert!(ledger.get(0).unwrap().is_idle());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.days_worked(), 1);
        assert_eq!(ledger.total_earned(), 50);
    }

    #[test]
    fn test_finance_payload() {
        let finance = WorkFinance::new(7, 120);
        assert_eq!(finance.to_payload(), "day=7;salary=120");
        assert_eq!(WorkFinance::from_payload("salary=120;day=7").unwrap(), finance);
        assert!(WorkFinance::from_payload("day=7;salary=12.5").is_err());
    }
}
