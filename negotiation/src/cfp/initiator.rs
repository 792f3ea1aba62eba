//! Initiator side of a contract-net round

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::evaluation::{evaluate_proposals, Award};
use super::{CfpConfig, NegotiationResult};
use crate::identity::AgentId;
use crate::messaging::{
    undeliverable_target, AgentContext, Message, MessageTemplate, Performative, TransportError,
};

/// Why a responder dropped out of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// The platform reported that the responder does not exist
    TargetAbsent,
    /// The responder itself reported a failure
    ResponderFailed,
}

/// A responder that dropped out, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderFailure {
    pub responder: AgentId,
    pub cause: FailureCause,
    pub detail: String,
}

/// Summary of one finished round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub conversation_id: String,
    pub winner: Option<Award>,
    /// Number of proposals evaluated
    pub proposals: usize,
    pub refusals: Vec<AgentId>,
    pub rejected: Vec<AgentId>,
    pub failures: Vec<ResponderFailure>,
    /// Responders still expected when the response window closed
    pub missing: usize,
    pub replies_sent: usize,
}

/// The winner's report on the awarded work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNotice {
    pub performer: AgentId,
    pub completed: bool,
    pub content: String,
}

/// Runs call-for-proposal rounds against a fixed set of responders
pub struct ContractNetInitiator {
    cfp: Message,
    responders: Vec<AgentId>,
    config: CfpConfig,
}

impl ContractNetInitiator {
    /// `cfp` supplies topic and content; performative, sender, receivers and
    /// conversation id are filled in for each round.
    ///
    /// Repeated responders are asked once, at their first position.
    pub fn new(cfp: Message, responders: Vec<AgentId>, config: CfpConfig) -> Self {
        let mut seen = HashSet::new();
        let responders = responders
            .into_iter()
            .filter(|responder| seen.insert(responder.clone()))
            .collect();
        Self {
            cfp,
            responders,
            config,
        }
    }

    pub fn responders(&self) -> &[AgentId] {
        &self.responders
    }

    /// Run one round: send the cfp, collect, evaluate and send the replies
    pub async fn run(&self, ctx: &mut AgentContext) -> NegotiationResult<RoundOutcome> {
        let conversation_id = format!("cfp-{}", Uuid::new_v4());

        let mut cfp = self.cfp.clone();
        cfp.performative = Performative::Cfp;
        cfp.sender = ctx.id().clone();
        cfp.receivers = self.responders.clone();
        cfp.conversation_id = Some(conversation_id.clone());

        info!(
            initiator = %ctx.id(),
            conversation_id = %conversation_id,
            responders = self.responders.len(),
            "Sending call for proposals"
        );
        ctx.send(cfp);

        let deadline = Instant::now() + self.config.response_timeout;
        let template = MessageTemplate::any().conversation(&conversation_id);

        let mut expected = self.responders.len();
        let mut responses: Vec<Message> = Vec::new();
        let mut answered: HashSet<AgentId> = HashSet::new();
        let mut refusals = Vec::new();
        let mut failures = Vec::new();

        while responses.len() < expected {
            let Some(message) = ctx.mailbox().receive_until(&template, deadline).await? else {
                break;
            };

            match message.performative {
                Performative::Propose | Performative::Refuse => {
                    if !self.responders.contains(&message.sender) {
                        warn!(
                            conversation_id = %conversation_id,
                            sender = %message.sender,
                            "Ignoring response from outside the responder set"
                        );
                        continue;
                    }
                    if !answered.insert(message.sender.clone()) {
                        warn!(
                            conversation_id = %conversation_id,
                            sender = %message.sender,
                            "Ignoring duplicate response"
                        );
                        continue;
                    }

                    if message.performative == Performative::Propose {
                        info!(
                            conversation_id = %conversation_id,
                            responder = %message.sender,
                            bid = %message.content,
                            "Responder proposed"
                        );
                    } else {
                        info!(
                            conversation_id = %conversation_id,
                            responder = %message.sender,
                            "Responder refused"
                        );
                        refusals.push(message.sender.clone());
                    }
                    responses.push(message);
                }
                Performative::Failure => {
                    let Some(failure) = self.classify_failure(&message) else {
                        debug!(
                            conversation_id = %conversation_id,
                            sender = %message.sender,
                            "Ignoring failure unrelated to this round"
                        );
                        continue;
                    };
                    if !answered.insert(failure.responder.clone()) {
                        continue;
                    }

                    match failure.cause {
                        FailureCause::TargetAbsent => warn!(
                            conversation_id = %conversation_id,
                            responder = %failure.responder,
                            "Responder does not exist"
                        ),
                        FailureCause::ResponderFailed => warn!(
                            conversation_id = %conversation_id,
                            responder = %failure.responder,
                            detail = %failure.detail,
                            "Responder reported a failure"
                        ),
                    }
                    expected = expected.saturating_sub(1);
                    failures.push(failure);
                }
                other => {
                    debug!(
                        conversation_id = %conversation_id,
                        performative = %other,
                        sender = %message.sender,
                        "Ignoring out-of-sequence message"
                    );
                }
            }
        }

        let missing = expected.saturating_sub(responses.len());
        if missing > 0 {
            warn!(
                conversation_id = %conversation_id,
                expected,
                received = responses.len(),
                missing,
                "Response timeout expired before all responders answered"
            );
        }

        let evaluation = evaluate_proposals(&responses, ctx.id())?;
        if let Some(award) = &evaluation.winner {
            info!(
                conversation_id = %conversation_id,
                winner = %award.proposer,
                bid = award.bid,
                "Accepting best proposal"
            );
        } else {
            info!(conversation_id = %conversation_id, "No proposals to accept");
        }

        let mut replies_sent = 0;
        for reply in evaluation.replies() {
            ctx.send(reply.clone());
            replies_sent += 1;
        }
        if evaluation.winner.is_none() {
            Self::close_conversation(ctx, &conversation_id);
        }

        Ok(RoundOutcome {
            conversation_id,
            rejected: evaluation.rejected(),
            winner: evaluation.winner,
            proposals: evaluation.proposals.len(),
            refusals,
            failures,
            missing,
            replies_sent,
        })
    }

    /// Wait for the winner of `outcome` to report on the awarded work.
    ///
    /// `Ok(None)` if the round had no winner or the inform timeout passed.
    pub async fn await_result(
        &self,
        ctx: &mut AgentContext,
        outcome: &RoundOutcome,
    ) -> Result<Option<ResultNotice>, TransportError> {
        let Some(award) = &outcome.winner else {
            return Ok(None);
        };

        let template = MessageTemplate::any()
            .conversation(&outcome.conversation_id)
            .sender(&award.proposer)
            .performatives(vec![Performative::Inform, Performative::Failure]);
        let deadline = Instant::now() + self.config.inform_timeout;

        let received = ctx.mailbox().receive_until(&template, deadline).await?;
        Self::close_conversation(ctx, &outcome.conversation_id);
        let Some(message) = received else {
            warn!(
                conversation_id = %outcome.conversation_id,
                winner = %award.proposer,
                "No result from winner before timeout"
            );
            return Ok(None);
        };

        let completed = message.performative == Performative::Inform;
        if completed {
            info!(
                conversation_id = %outcome.conversation_id,
                winner = %award.proposer,
                result = %message.content,
                "Winner performed the action"
            );
        } else {
            warn!(
                conversation_id = %outcome.conversation_id,
                winner = %award.proposer,
                detail = %message.content,
                "Winner failed to perform the action"
            );
        }

        Ok(Some(ResultNotice {
            performer: message.sender,
            completed,
            content: message.content,
        }))
    }

    /// Drop late traffic of a finished conversation
    fn close_conversation(ctx: &mut AgentContext, conversation_id: &str) {
        let dropped = ctx
            .mailbox()
            .discard(&MessageTemplate::any().conversation(conversation_id));
        if dropped > 0 {
            debug!(conversation_id, dropped, "Dropped late replies");
        }
    }

    fn classify_failure(&self, message: &Message) -> Option<ResponderFailure> {
        let (responder, cause) = if message.sender.is_platform() {
            (undeliverable_target(message)?, FailureCause::TargetAbsent)
        } else {
            (message.sender.clone(), FailureCause::ResponderFailed)
        };

        self.responders.contains(&responder).then(|| ResponderFailure {
            responder,
            cause,
            detail: message.content.clone(),
        })
    }
}
