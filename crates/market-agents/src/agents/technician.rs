//! A technician actor.
//!
//! Wraps a [`TechnicianLifecycle`] with everything around it: directory
//! registration, answering repair calls, and acknowledging each clock tick
//! once its phase has been handled.

use std::sync::Arc;

use negotiation::{
    AgentContext, AgentEvent, AgentId, ClockTick, EmploymentState, Message, MessageTemplate,
    NegotiationStrategy, Performative, ServiceDescription, ServiceDirectory, TechnicianLifecycle,
    TechnicianSnapshot, Topic,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{AgentError, TickAck};
use crate::config::TechnicianSpec;

pub struct TechnicianAgent<S> {
    ctx: AgentContext,
    lifecycle: TechnicianLifecycle<S>,
    skill: String,
    bid: i64,
    directory: Arc<dyn ServiceDirectory>,
    acks: mpsc::UnboundedSender<TickAck>,
    repairs_done: usize,
}

impl<S: NegotiationStrategy> TechnicianAgent<S> {
    pub fn new(
        ctx: AgentContext,
        spec: &TechnicianSpec,
        lifecycle: TechnicianLifecycle<S>,
        directory: Arc<dyn ServiceDirectory>,
        acks: mpsc::UnboundedSender<TickAck>,
    ) -> Self {
        Self {
            ctx,
            lifecycle,
            skill: spec.skill.clone(),
            bid: spec.bid,
            directory,
            acks,
            repairs_done: 0,
        }
    }

    /// Register, get hired, then follow the clock until cancelled.
    ///
    /// `hired` fires once the first contract is in hand. The directory entry
    /// is removed on every exit path.
    pub async fn run(
        mut self,
        hired: mpsc::UnboundedSender<AgentId>,
        cancel: CancellationToken,
    ) -> Result<TechnicianSnapshot, AgentError> {
        self.directory
            .register(self.ctx.id(), ServiceDescription::repairs(&self.skill))?;

        let result = self.work(hired, cancel).await;

        if let Err(e) = self.directory.deregister(self.ctx.id()) {
            warn!(technician = %self.ctx.id(), error = %e, "Deregistration failed");
        }
        info!(
            technician = %self.ctx.id(),
            repairs = self.repairs_done,
            employment = %self.lifecycle.employment_summary(),
            "Technician has terminated"
        );

        match result {
            Ok(()) => Ok(self.lifecycle.snapshot()),
            Err(e) => {
                error!(technician = %self.ctx.id(), error = %e, "Technician stopped on error");
                Err(e)
            }
        }
    }

    async fn work(
        &mut self,
        hired: mpsc::UnboundedSender<AgentId>,
        cancel: CancellationToken,
    ) -> Result<(), AgentError> {
        let hired_from = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            contract = self.lifecycle.initial_employment(&mut self.ctx) => contract?.start(),
        };
        let _ = hired.send(self.ctx.id().clone());
        drop(hired);

        let template = MessageTemplate::any()
            .topic(Topic::Repairs)
            .performatives(vec![
                Performative::Cfp,
                Performative::AcceptProposal,
                Performative::RejectProposal,
            ]);

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                event = self.ctx.next_event(&template) => event?,
            };

            match event {
                AgentEvent::Tick(tick) if tick.day < hired_from => {
                    debug!(
                        technician = %self.ctx.id(),
                        day = tick.day,
                        phase = %tick.phase,
                        "Skipping tick from before the first contract"
                    );
                    self.ack(&tick);
                }
                AgentEvent::Tick(tick) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        result = self.lifecycle.on_tick(&mut self.ctx, &tick) => result?,
                    }
                    self.ack(&tick);
                }
                AgentEvent::Message(message) => self.on_repair_message(message),
            }
        }
    }

    fn ack(&self, tick: &ClockTick) {
        let _ = self.acks.send(TickAck {
            agent: self.ctx.id().clone(),
            day: tick.day,
            phase: tick.phase,
        });
    }

    fn on_repair_message(&mut self, message: Message) {
        let me = self.ctx.id().clone();
        match message.performative {
            Performative::Cfp if self.lifecycle.state() == EmploymentState::Working => {
                debug!(technician = %me, bid = self.bid, "Bidding on repair");
                self.ctx.send(
                    message
                        .reply(Performative::Propose, me)
                        .content(self.bid.to_string()),
                );
            }
            Performative::Cfp => {
                debug!(technician = %me, "Refusing repair while out of work");
                self.ctx.send(message.reply(Performative::Refuse, me));
            }
            Performative::AcceptProposal => {
                self.repairs_done += 1;
                info!(technician = %me, client = %message.sender, skill = %self.skill, "Repair performed");
                let report = format!("{} repair done by {}", self.skill, me);
                self.ctx
                    .send(message.reply(Performative::Inform, me).content(report));
            }
            _ => debug!(technician = %me, client = %message.sender, "Repair bid rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use negotiation::{Contract, Phase, Postman, RaisePolicy, WorkFinance, WorldClock, YellowPages};

    #[tokio::test]
    async fn test_hired_after_clock_start_skips_earlier_ticks() {
        let postman = Postman::new().shared();
        let clock = WorldClock::new(0).shared();
        let mut company =
            AgentContext::join("company".into(), postman.clone(), clock.clone()).unwrap();
        let ctx = AgentContext::join("tech-1".into(), postman.clone(), clock.clone()).unwrap();

        // Night(0) and Day(0) go out before anyone is hired
        clock.advance();
        clock.advance();

        let spec = TechnicianSpec {
            name: "tech-1".into(),
            skill: "plumbing".into(),
            bid: 20,
        };
        let lifecycle =
            TechnicianLifecycle::new("tech-1".into(), "company".into(), RaisePolicy::default());
        let (ack_tx, mut ack_rx) = mpsc::unbounded_channel();
        let (hired_tx, mut hired_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let directory = Arc::new(YellowPages::new());
        let agent = TechnicianAgent::new(ctx, &spec, lifecycle, directory, ack_tx);
        let handle = tokio::spawn(agent.run(hired_tx, cancel.clone()));

        let subscribe = company
            .mailbox()
            .receive(&MessageTemplate::any().performative(Performative::Subscribe))
            .await
            .unwrap();
        let contract = Contract::new("company".into(), "tech-1".into(), 1, 9, 70).unwrap();
        company.send(
            subscribe
                .reply(Performative::Inform, "company".into())
                .topic(Topic::Employment)
                .content(contract.to_payload()),
        );
        assert_eq!(hired_rx.recv().await, Some(AgentId::new("tech-1")));

        clock.advance();
        company.send(
            Message::new(Performative::Inform, "company".into())
                .to("tech-1".into())
                .topic(Topic::Payment)
                .content(WorkFinance::new(1, 70).to_payload()),
        );

        loop {
            let ack = ack_rx.recv().await.unwrap();
            if (ack.day, ack.phase) == (1, Phase::Night) {
                break;
            }
            assert_eq!(ack.day, 0);
        }

        cancel.cancel();
        let snapshot = handle.await.unwrap().unwrap();
        assert_eq!(snapshot.days_worked, 1);
        assert_eq!(snapshot.total_earned, 70);
    }
}
