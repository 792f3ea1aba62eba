//! The employer.
//!
//! Grants a contract to every technician that subscribes, pays each night
//! to everyone whose contract covers it, and accepts renewal proposals that
//! name it as employer.

use std::collections::BTreeMap;

use negotiation::{
    AgentContext, AgentEvent, AgentId, ClockTick, Contract, Day, Message, MessageTemplate,
    Performative, Phase, Topic, WorkFinance,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AgentError;

/// Terms offered on first employment
#[derive(Debug, Clone, Copy)]
pub struct HiringTerms {
    pub term_days: u32,
    pub salary: u64,
}

/// What the company did over a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyReport {
    pub company: String,
    pub contracts_signed: usize,
    pub renewals_accepted: usize,
    pub renewals_rejected: usize,
    pub payments_made: usize,
    pub total_paid: u64,
}

pub struct Company {
    ctx: AgentContext,
    terms: HiringTerms,
    /// Signed contracts per employee, in signing order
    contracts: BTreeMap<AgentId, Vec<Contract>>,
    report: CompanyReport,
}

impl Company {
    pub fn new(ctx: AgentContext, terms: HiringTerms) -> Self {
        let report = CompanyReport {
            company: ctx.id().to_string(),
            ..CompanyReport::default()
        };
        Self {
            ctx,
            terms,
            contracts: BTreeMap::new(),
            report,
        }
    }

    /// Serve subscriptions, proposals and paydays until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<CompanyReport, AgentError> {
        let template = MessageTemplate::any().performatives(vec![
            Performative::Subscribe,
            Performative::Propose,
            Performative::Failure,
        ]);
        info!(company = %self.ctx.id(), "Company open for business");

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.ctx.next_event(&template) => event,
            };

            match event {
                Ok(AgentEvent::Tick(tick)) => self.on_tick(&tick),
                Ok(AgentEvent::Message(message)) => self.on_message(message),
                Err(e) => {
                    debug!(company = %self.ctx.id(), error = %e, "Company event stream ended");
                    break;
                }
            }
        }

        info!(
            company = %self.ctx.id(),
            contracts = self.report.contracts_signed,
            total_paid = self.report.total_paid,
            "Company closed"
        );
        Ok(self.report)
    }

    fn on_tick(&mut self, tick: &ClockTick) {
        if tick.phase == Phase::Night {
            self.pay_night(tick.day);
        }
    }

    fn on_message(&mut self, message: Message) {
        match (message.performative, message.topic) {
            (Performative::Subscribe, Some(Topic::Employment)) => self.hire(&message),
            (Performative::Propose, Some(Topic::Offer)) => self.consider_renewal(&message),
            (Performative::Failure, _) => warn!(
                company = %self.ctx.id(),
                detail = %message.content,
                "Delivery failed"
            ),
            (performative, topic) => debug!(
                company = %self.ctx.id(),
                %performative,
                ?topic,
                sender = %message.sender,
                "Ignoring message"
            ),
        }
    }

    fn hire(&mut self, request: &Message) {
        let employee = request.sender.clone();
        if self.contracts.contains_key(&employee) {
            warn!(company = %self.ctx.id(), technician = %employee, "Already employed, ignoring subscription");
            return;
        }

        // Once any phase of today was announced, tonight is already paid
        let start = match self.ctx.last_tick() {
            Some(tick) => tick.day.saturating_add(1),
            None => self.ctx.today(),
        };
        let end = start.saturating_add(self.terms.term_days.max(1) - 1);
        let contract = match Contract::new(
            self.ctx.id().clone(),
            employee.clone(),
            start,
            end,
            self.terms.salary,
        ) {
            Ok(contract) => contract,
            Err(e) => {
                warn!(company = %self.ctx.id(), technician = %employee, error = %e, "Cannot hire");
                return;
            }
        };

        info!(company = %self.ctx.id(), contract = %contract, "Granting employment");
        self.ctx.send(
            request
                .reply(Performative::Inform, self.ctx.id().clone())
                .topic(Topic::Employment)
                .content(contract.to_payload()),
        );
        self.contracts.entry(employee).or_default().push(contract);
        self.report.contracts_signed += 1;
    }

    fn consider_renewal(&mut self, proposal: &Message) {
        let verdict = Contract::from_payload(&proposal.content)
            .map_err(|e| e.to_string())
            .and_then(|contract| self.check_renewal(&proposal.sender, contract));

        match verdict {
            Ok(contract) => {
                info!(company = %self.ctx.id(), contract = %contract, "Accepting renewal");
                self.ctx.send(
                    proposal
                        .reply(Performative::AcceptProposal, self.ctx.id().clone())
                        .content(contract.to_payload()),
                );
                self.contracts
                    .entry(proposal.sender.clone())
                    .or_default()
                    .push(contract);
                self.report.contracts_signed += 1;
                self.report.renewals_accepted += 1;
            }
            Err(reason) => {
                warn!(
                    company = %self.ctx.id(),
                    technician = %proposal.sender,
                    %reason,
                    "Rejecting renewal"
                );
                self.ctx.send(
                    proposal
                        .reply(Performative::RejectProposal, self.ctx.id().clone())
                        .content(reason),
                );
                self.report.renewals_rejected += 1;
            }
        }
    }

    fn check_renewal(&self, sender: &AgentId, contract: Contract) -> Result<Contract, String> {
        if contract.employer() != self.ctx.id() || contract.employee() != sender {
            return Err(format!("{contract} does not bind {sender} to {}", self.ctx.id()));
        }
        let overlaps = self
            .contracts
            .get(sender)
            .is_some_and(|signed| signed.iter().any(|c| c.end() >= contract.start()));
        if overlaps {
            return Err(format!("{contract} overlaps an existing contract"));
        }
        Ok(contract)
    }

    fn pay_night(&mut self, day: Day) {
        for (employee, signed) in &self.contracts {
            let Some(contract) = signed.iter().find(|c| c.covers(day)) else {
                continue;
            };
            let finance = WorkFinance::new(day, contract.salary());
            debug!(company = %self.ctx.id(), technician = %employee, day, salary = finance.salary, "Paying");
            self.ctx.send(
                Message::new(Performative::Inform, self.ctx.id().clone())
                    .to(employee.clone())
                    .topic(Topic::Payment)
                    .content(finance.to_payload()),
            );
            self.report.payments_made += 1;
            self.report.total_paid += finance.salary;
        }
    }

    /// Contracts signed with `employee`, oldest first
    pub fn contracts_with(&self, employee: &AgentId) -> &[Contract] {
        self.contracts.get(employee).map(Vec::as_slice).unwrap_or(&[])
    }
}
