//! Technician day/night cycle
//!
//! ```text
//!  start ──▶ initial_employment ──▶ Working
//!
//!  every day d:
//!    Night(d)  night_settlement   Working: wait for pay(d), log it
//!                                 Unemployed: log an idle day
//!    Day(d)    renewal_lookup     maybe propose a follow-up, wait for the answer
//!              rollover           archive ended contract, promote next
//! ```
//!
//! All waits block without a timeout until the company answers. Messages
//! that arrive meanwhile stay parked in the mailbox.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::state::{EmploymentMachine, EmploymentState, TransitionRecord};
use super::{LifecycleError, LifecycleResult};
use crate::clock::{ClockTick, Day, Phase, Topic};
use crate::contract::{Contract, WorkFinance, WorkLedger, WorkLog};
use crate::identity::AgentId;
use crate::messaging::{AgentContext, Message, MessageTemplate, Performative};
use crate::strategy::{NegotiationStrategy, RenewalContext};

/// Point-in-time view of a technician, for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicianSnapshot {
    pub technician: AgentId,
    pub company: AgentId,
    pub state: EmploymentState,
    pub current: Option<Contract>,
    pub next: Option<Contract>,
    /// Every contract signed, in signing order
    pub signed: Vec<Contract>,
    /// Contracts that ran to their end day
    pub completed: Vec<Contract>,
    pub work_logs: Vec<WorkLog>,
    pub transitions: Vec<TransitionRecord>,
    pub days_worked: usize,
    pub total_earned: u64,
}

/// Employment lifecycle of one technician
pub struct TechnicianLifecycle<S> {
    id: AgentId,
    company: AgentId,
    strategy: S,
    machine: EmploymentMachine,
    current: Option<Contract>,
    next: Option<Contract>,
    signed: Vec<Contract>,
    completed: Vec<Contract>,
    ledger: WorkLedger,
    last_settled: Option<Day>,
}

impl<S: NegotiationStrategy> TechnicianLifecycle<S> {
    pub fn new(id: AgentId, company: AgentId, strategy: S) -> Self {
        Self {
            id,
            company,
            strategy,
            machine: EmploymentMachine::new(),
            current: None,
            next: None,
            signed: Vec::new(),
            completed: Vec::new(),
            ledger: WorkLedger::new(),
            last_settled: None,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn company(&self) -> &AgentId {
        &self.company
    }

    pub fn state(&self) -> EmploymentState {
        self.machine.current()
    }

    pub fn current(&self) -> Option<&Contract> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&Contract> {
        self.next.as_ref()
    }

    pub fn signed(&self) -> &[Contract] {
        &self.signed
    }

    pub fn ledger(&self) -> &WorkLedger {
        &self.ledger
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        self.machine.transitions()
    }

    /// One-line employment history for logs
    pub fn employment_summary(&self) -> String {
        self.machine.summary()
    }

    /// Ask the company for work and wait until it grants a contract.
    pub async fn initial_employment(&mut self, ctx: &mut AgentContext) -> LifecycleResult<&Contract> {
        ctx.send(
            Message::new(Performative::Subscribe, self.id.clone())
                .to(self.company.clone())
                .topic(Topic::Employment),
        );
        info!(technician = %self.id, company = %self.company, "Subscribed for employment");

        let template = MessageTemplate::any()
            .topic(Topic::Employment)
            .performative(Performative::Inform)
            .sender(&self.company);
        let grant = ctx.mailbox().receive(&template).await?;

        let contract = Contract::from_payload(&grant.content)?;
        self.check_parties(&contract)?;

        info!(
            technician = %self.id,
            contract = %contract,
            "Employment granted"
        );
        self.machine
            .advance(EmploymentState::Working, contract.start(), Some("hired"))?;
        self.signed.push(contract.clone());
        Ok(self.current.insert(contract))
    }

    /// Settle night `day`: collect the pay if working, else log an idle day.
    pub async fn night_settlement(
        &mut self,
        ctx: &mut AgentContext,
        day: Day,
    ) -> LifecycleResult<WorkLog> {
        if let Some(last) = self.last_settled {
            if day <= last {
                return Err(LifecycleError::OutOfOrder {
                    day,
                    last_settled: Some(last),
                });
            }
        }

        let log = match (self.state(), &self.current) {
            (EmploymentState::Working, Some(contract)) => {
                let template = MessageTemplate::any()
                    .topic(Topic::Payment)
                    .performative(Performative::Inform)
                    .sender(&self.company);
                let payment = ctx.mailbox().receive(&template).await?;
                let finance = WorkFinance::from_payload(&payment.content)?;

                if finance.day != day {
                    return Err(LifecycleError::WrongPaymentDay {
                        expected: day,
                        paid: finance.day,
                    });
                }

                info!(
                    technician = %self.id,
                    day,
                    salary = finance.salary,
                    "Night settled"
                );
                WorkLog::worked(contract.clone(), finance)?
            }
            _ => {
                debug!(technician = %self.id, day, "Idle night");
                WorkLog::idle(day)
            }
        };

        self.ledger.record(log.clone())?;
        self.last_settled = Some(day);
        Ok(log)
    }

    /// Negotiate a follow-up contract if the strategy asks for one.
    ///
    /// Returns the accepted contract, or `None` when nothing was negotiated.
    pub async fn renewal_lookup(
        &mut self,
        ctx: &mut AgentContext,
        day: Day,
    ) -> LifecycleResult<Option<Contract>> {
        if self.next.is_some() {
            return Ok(None);
        }
        let Some(last_signed) = self.signed.last() else {
            return Ok(None);
        };

        let view = RenewalContext {
            technician: &self.id,
            company: &self.company,
            today: day,
            current: self.current.as_ref(),
            next: self.next.as_ref(),
            last_signed,
        };
        if !self.strategy.should_seek_renewal(&view) {
            return Ok(None);
        }
        let proposal = self.strategy.propose_renewal(&view);
        self.check_proposal(&proposal, day)?;

        info!(
            technician = %self.id,
            day,
            proposal = %proposal,
            "Proposing renewal"
        );
        ctx.send(
            Message::new(Performative::Propose, self.id.clone())
                .to(self.company.clone())
                .topic(Topic::Offer)
                .content(proposal.to_payload()),
        );

        let template = MessageTemplate::any()
            .topic(Topic::Offer)
            .performatives(vec![Performative::AcceptProposal, Performative::RejectProposal])
            .sender(&self.company);
        let answer = ctx.mailbox().receive(&template).await?;
        if answer.performative == Performative::RejectProposal {
            warn!(
                technician = %self.id,
                day,
                proposal = %proposal,
                reason = %answer.content,
                "Renewal rejected"
            );
            return Err(LifecycleError::RenewalRejected {
                proposal,
                reason: answer.content,
            });
        }

        info!(technician = %self.id, day, contract = %proposal, "Renewal accepted");
        self.signed.push(proposal.clone());
        self.next = Some(proposal.clone());
        Ok(Some(proposal))
    }

    /// End-of-day bookkeeping: archive a finished contract and promote the
    /// pending one that starts tomorrow.
    ///
    /// Returns the transition recorded, if the state changed.
    pub fn rollover(&mut self, day: Day) -> LifecycleResult<Option<TransitionRecord>> {
        let mut reason = None;

        if self.current.as_ref().is_some_and(|c| c.has_ended_by(day)) {
            if let Some(ended) = self.current.take() {
                info!(technician = %self.id, day, contract = %ended, "Contract ended");
                self.completed.push(ended);
                reason = Some("contract ended");
            }
        }

        let starts_tomorrow = self
            .next
            .as_ref()
            .is_some_and(|n| Some(n.start()) == day.checked_add(1));
        if self.current.is_none() && starts_tomorrow {
            if let Some(next) = self.next.take() {
                info!(technician = %self.id, day, contract = %next, "Next contract takes over");
                self.current = Some(next);
                reason = Some("next contract started");
            }
        }

        let target = if self.current.is_some() {
            EmploymentState::Working
        } else {
            EmploymentState::Unemployed
        };

        if self.machine.settle(target, day, reason)? {
            Ok(self.machine.transitions().last().cloned())
        } else {
            Ok(None)
        }
    }

    /// Renewal lookup then rollover for `day`; night `day` must be settled first.
    pub async fn day_phase(&mut self, ctx: &mut AgentContext, day: Day) -> LifecycleResult<()> {
        if self.last_settled != Some(day) {
            return Err(LifecycleError::OutOfOrder {
                day,
                last_settled: self.last_settled,
            });
        }

        self.renewal_lookup(ctx, day).await?;
        self.rollover(day)?;
        Ok(())
    }

    /// Dispatch a clock tick to the matching phase
    pub async fn on_tick(&mut self, ctx: &mut AgentContext, tick: &ClockTick) -> LifecycleResult<()> {
        match tick.phase {
            Phase::Night => self.night_settlement(ctx, tick.day).await.map(|_| ()),
            Phase::Day => self.day_phase(ctx, tick.day).await,
        }
    }

    pub fn snapshot(&self) -> TechnicianSnapshot {
        TechnicianSnapshot {
            technician: self.id.clone(),
            company: self.company.clone(),
            state: self.state(),
            current: self.current.clone(),
            next: self.next.clone(),
            signed: self.signed.clone(),
            completed: self.completed.clone(),
            work_logs: self.ledger.iter().cloned().collect(),
            transitions: self.machine.transitions().to_vec(),
            days_worked: self.ledger.days_worked(),
            total_earned: self.ledger.total_earned(),
        }
    }

    fn check_parties(&self, contract: &Contract) -> LifecycleResult<()> {
        if contract.employee() != &self.id || contract.employer() != &self.company {
            return Err(LifecycleError::ForeignContract(contract.clone()));
        }
        Ok(())
    }

    fn check_proposal(&self, proposal: &Contract, day: Day) -> LifecycleResult<()> {
        if proposal.employee() != &self.id || proposal.employer() != &self.company {
            return Err(LifecycleError::InvalidProposal(format!(
                "{proposal} does not name {} and {}",
                self.id, self.company
            )));
        }
        if proposal.start() <= day {
            return Err(LifecycleError::InvalidProposal(format!(
                "{proposal} starts on or before day {day}"
            )));
        }
        if let Some(current) = &self.current {
            if proposal.start() <= current.end() {
                return Err(LifecycleError::InvalidProposal(format!(
                    "{proposal} overlaps the current contract {current}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::RaisePolicy;

    fn contract(start: Day, end: Day, salary: u64) -> Contract {
        Contract::new("company".into(), "tech-1".into(), start, end, salary).unwrap()
    }

    fn working(current: Contract, next: Option<Contract>) -> TechnicianLifecycle<RaisePolicy> {
        let mut tech =
            TechnicianLifecycle::new("tech-1".into(), "company".into(), RaisePolicy::default());
        tech.machine
            .advance(EmploymentState::Working, current.start(), Some("hired"))
            .unwrap();
        tech.signed.push(current.clone());
        tech.current = Some(current);
        if let Some(next) = next {
            tech.signed.push(next.clone());
            tech.next = Some(next);
        }
        tech
    }

    #[test]
    fn test_rollover_hands_over_without_transition() {
        let mut tech = working(contract(0, 10, 100), Some(contract(11, 20, 105)));

        let transition = tech.rollover(10).unwrap();

        assert!(transition.is_none());
        assert_eq!(tech.state(), EmploymentState::Working);
        assert_eq!(tech.current(), Some(&contract(11, 20, 105)));
        assert!(tech.next().is_none());
        assert_eq!(tech.snapshot().completed, vec![contract(0, 10, 100)]);
        assert_eq!(tech.transitions().len(), 1);
    }

    #[test]
    fn test_end_day_is_still_worked() {
        let mut tech = working(contract(0, 10, 100), None);

        // Day 9: nothing ends
        assert!(tech.rollover(9).unwrap().is_none());
        assert_eq!(tech.state(), EmploymentState::Working);

        // Day 10 is the last day of the term; it ends with that day
        let transition = tech.rollover(10).unwrap().unwrap();
        assert_eq!(transition.from, EmploymentState::Working);
        assert_eq!(transition.to, EmploymentState::Unemployed);
        assert_eq!(transition.day, 10);
        assert!(tech.current().is_none());
    }

    #[test]
    fn test_rollover_on_last_representable_day() {
        let mut tech = working(contract(u32::MAX - 1, u32::MAX, 100), None);
        assert!(tech.rollover(u32::MAX - 1).unwrap().is_none());

        let transition = tech.rollover(u32::MAX).unwrap().unwrap();
        assert_eq!(transition.to, EmploymentState::Unemployed);
        assert_eq!(tech.snapshot().completed[0].term_days(), 2);
    }

    #[test]
    fn test_pending_contract_waits_for_its_start() {
        let mut tech = working(contract(0, 4, 100), Some(contract(8, 12, 100)));

        tech.rollover(4).unwrap();
        assert_eq!(tech.state(), EmploymentState::Unemployed);
        assert!(tech.next().is_some());

        for day in 5..7 {
            assert!(tech.rollover(day).unwrap().is_none());
        }

        let transition = tech.rollover(7).unwrap().unwrap();
        assert_eq!(transition.to, EmploymentState::Working);
        assert_eq!(tech.current().map(Contract::start), Some(8));
    }

    #[test]
    fn test_transitions_alternate() {
        let mut tech = working(contract(0, 1, 10), None);
        tech.rollover(1).unwrap();
        tech.next = Some(contract(3, 3, 10));
        for day in 2..6 {
            tech.rollover(day).unwrap();
        }

        let states: Vec<_> = tech.transitions().iter().map(|t| (t.from, t.to)).collect();
        for pair in &states {
            assert_ne!(pair.0, pair.1);
        }
        for window in states.windows(2) {
            assert_eq!(window[0].1, window[1].0);
        }
        assert_eq!(tech.state(), EmploymentState::Unemployed);
    }

    #[test]
    fn test_proposal_validation() {
        let tech = working(contract(0, 10, 100), None);

        assert!(tech.check_proposal(&contract(11, 15, 100), 9).is_ok());
        assert!(matches!(
            tech.check_proposal(&contract(10, 15, 100), 9),
            Err(LifecycleError::InvalidProposal(_))
        ));
        assert!(matches!(
            tech.check_proposal(&contract(9, 15, 100), 9),
            Err(LifecycleError::InvalidProposal(_))
        ));

        let foreign = Contract::new("company".into(), "tech-2".into(), 11, 15, 100).unwrap();
        assert!(matches!(
            tech.check_proposal(&foreign, 9),
            Err(LifecycleError::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_snapshot_serializes() {
        let tech = working(contract(0, 10, 100), None);
        let json = serde_json::to_value(tech.snapshot()).unwrap();
        assert_eq!(json["state"], "working");
        assert_eq!(json["technician"], "tech-1");
        assert_eq!(json["total_earned"], 0);
    }
}
