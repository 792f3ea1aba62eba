//! Repair client.
//!
//! Every few days the client looks up `tech-repairs` providers in the
//! directory and runs a call-for-proposals round among them. Configured
//! phantom names are added to the responder set so rounds also see
//! platform delivery failures.

use std::sync::Arc;

use negotiation::{
    AgentContext, AgentId, CfpConfig, ContractNetInitiator, Day, Message, MessageTemplate,
    Performative, Phase, ResultNotice, RoundOutcome, ServiceDirectory, Topic, TECH_REPAIRS,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AgentError;

/// One repair round and how it ended
#[derive(Debug, Clone, Serialize)]
pub struct RepairRound {
    pub day: Day,
    pub outcome: RoundOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultNotice>,
}

pub struct RepairClient {
    ctx: AgentContext,
    directory: Arc<dyn ServiceDirectory>,
    phantoms: Vec<AgentId>,
    cfp: CfpConfig,
    every_days: u32,
    rounds: Vec<RepairRound>,
}

impl RepairClient {
    pub fn new(
        ctx: AgentContext,
        directory: Arc<dyn ServiceDirectory>,
        phantoms: Vec<AgentId>,
        cfp: CfpConfig,
        every_days: u32,
    ) -> Self {
        Self {
            ctx,
            directory,
            phantoms,
            cfp,
            every_days,
            rounds: Vec::new(),
        }
    }

    /// Run a round on every `every_days`-th day until cancelled
    pub async fn run(mut self, cancel: CancellationToken) -> Result<Vec<RepairRound>, AgentError> {
        if self.every_days == 0 {
            cancel.cancelled().await;
            return Ok(self.rounds);
        }

        loop {
            let tick = tokio::select! {
                _ = cancel.cancelled() => break,
                tick = self.ctx.next_tick() => match tick {
                    Some(tick) => tick,
                    None => break,
                },
            };
            if tick.phase != Phase::Day || tick.day % self.every_days != 0 {
                continue;
            }

            let round = tokio::select! {
                _ = cancel.cancelled() => break,
                round = self.repair_round(tick.day) => round?,
            };
            self.rounds.push(round);
        }

        info!(client = %self.ctx.id(), rounds = self.rounds.len(), "Repair client stopped");
        Ok(self.rounds)
    }

    /// One call for proposals among the current providers
    pub async fn repair_round(&mut self, day: Day) -> Result<RepairRound, AgentError> {
        let stale = self.ctx.mailbox().discard(&MessageTemplate::any());
        if stale > 0 {
            debug!(client = %self.ctx.id(), day, stale, "Dropped replies from earlier rounds");
        }

        let mut responders = self.directory.search(TECH_REPAIRS);
        responders.extend(self.phantoms.iter().cloned());

        let request = Message::new(Performative::Cfp, self.ctx.id().clone())
            .topic(Topic::Repairs)
            .content(format!("repair request for day {day}"));
        let initiator = ContractNetInitiator::new(request, responders, self.cfp.clone());
        debug!(
            client = %self.ctx.id(),
            day,
            responders = initiator.responders().len(),
            "Opening repair round"
        );

        let outcome = initiator.run(&mut self.ctx).await?;
        let result = initiator.await_result(&mut self.ctx, &outcome).await?;

        if outcome.winner.is_some() && result.is_none() {
            warn!(client = %self.ctx.id(), day, "Repair winner never reported back");
        }
        Ok(RepairRound {
            day,
            outcome,
            result,
        })
    }
}
