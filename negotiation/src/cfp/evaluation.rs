//! Proposal evaluation
//!
//! Picks the winner of a round from the collected responses. The comparison
//! is deterministic: the strictly highest bid wins and an exact tie keeps
//! whoever proposed first in response order.

use serde::{Deserialize, Serialize};

use super::NegotiationError;
use crate::identity::AgentId;
use crate::messaging::{Message, Performative};

/// One received bid and the reply prepared for it
#[derive(Debug, Clone)]
pub struct Proposal {
    pub proposer: AgentId,
    pub bid: i64,
    pub reply: Message,
}

/// The winning proposer and bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub proposer: AgentId,
    pub bid: i64,
}

/// Result of evaluating a round's responses
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub winner: Option<Award>,
    /// Every proposal in response order; exactly one reply is an accept
    /// when there is a winner, all others are rejects
    pub proposals: Vec<Proposal>,
}

impl Evaluation {
    /// Replies to send, one per proposal
    pub fn replies(&self) -> impl Iterator<Item = &Message> {
        self.proposals.iter().map(|p| &p.reply)
    }

    pub fn rejected(&self) -> Vec<AgentId> {
        self.proposals
            .iter()
            .filter(|p| p.reply.performative == Performative::RejectProposal)
            .map(|p| p.proposer.clone())
            .collect()
    }
}

/// Parse a bid payload: a plain decimal integer, nothing else
pub fn parse_bid(message: &Message) -> Result<i64, NegotiationError> {
    message
        .content
        .parse::<i64>()
        .map_err(|_| NegotiationError::MalformedBid {
            proposer: message.sender.clone(),
            content: message.content.clone(),
        })
}

/// Evaluate the `Propose` messages among `responses`, replying as `initiator`.
///
/// Non-propose responses (refusals) are skipped and get no reply. A bid that
/// does not parse aborts the evaluation.
pub fn evaluate_proposals(
    responses: &[Message],
    initiator: &AgentId,
) -> Result<Evaluation, NegotiationError> {
    let mut proposals: Vec<Proposal> = Vec::new();
    let mut best: Option<usize> = None;

    for message in responses
        .iter()
        .filter(|m| m.performative == Performative::Propose)
    {
        let bid = parse_bid(message)?;
        let is_better = best.map_or(true, |i| bid > proposals[i].bid);

        proposals.push(Proposal {
            proposer: message.sender.clone(),
            bid,
            reply: message
                .reply(Performative::RejectProposal, initiator.clone())
                .content(bid.to_string()),
        });

        if is_better {
            best = Some(proposals.len() - 1);
        }
    }

    let winner = best.map(|i| {
        let proposal = &mut proposals[i];
        proposal.reply.performative = Performative::AcceptProposal;
        Award {
            proposer: proposal.proposer.clone(),
            bid: proposal.bid,
        }
    });

    Ok(Evaluation { winner, proposals })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn propose(sender: &str, bid: &str) -> Message {
        Message::new(Performative::Propose, sender.into())
            .to("client".into())
            .conversation("round-1")
            .content(bid)
    }

    fn refuse(sender: &str) -> Message {
        Message::new(Performative::Refuse, sender.into()).conversation("round-1")
    }

    fn client() -> AgentId {
        AgentId::new("client")
    }

    #[test]
    fn test_first_of_tied_maximum_wins() {
        let responses = vec![propose("a", "10"), propose("b", "25"), propose("c", "25")];
        let evaluation = evaluate_proposals(&responses, &client()).unwrap();

        assert_eq!(
            evaluation.winner,
            Some(Award {
                proposer: "b".into(),
                bid: 25
            })
        );
        let performatives: Vec<_> = evaluation.replies().map(|r| r.performative).collect();
        assert_eq!(
            performatives,
            vec![
                Performative::RejectProposal,
                Performative::AcceptProposal,
                Performative::RejectProposal
            ]
        );
        assert_eq!(evaluation.rejected(), vec![AgentId::new("a"), AgentId::new("c")]);
    }

    #[test]
    fn test_winner_is_strict_maximum_over_orderings() {
        let bids = [3i64, -7, 42, 0, 41, 42];
        for rotation in 0..bids.len() {
            let responses: Vec<Message> = (0..bids.len())
                .map(|i| {
                    let k = (i + rotation) % bids.len();
                    propose(&format!("r{k}"), &bids[k].to_string())
                })
                .collect();

            let evaluation = evaluate_proposals(&responses, &client()).unwrap();
            let winner = evaluation.winner.unwrap();
            assert_eq!(winner.bid, 42);

            // First 42 in response order wins
            let first_max = responses.iter().find(|m| m.content == "42").unwrap();
            assert_eq!(winner.proposer, first_max.sender);
            assert_eq!(evaluation.proposals.len(), responses.len());
        }
    }

    #[test]
    fn test_refusals_get_no_reply() {
        let responses = vec![refuse("a"), propose("b", "5"), refuse("c")];
        let evaluation = evaluate_proposals(&responses, &client()).unwrap();

        assert_eq!(evaluation.proposals.len(), 1);
        assert!(evaluation
            .replies()
            .all(|r| r.receivers == vec![AgentId::new("b")]));
    }

    #[test]
    fn test_no_proposals_means_no_winner() {
        let evaluation = evaluate_proposals(&[refuse("a")], &client()).unwrap();
        assert!(evaluation.winner.is_none());
        assert_eq!(evaluation.replies().count(), 0);

        let evaluation = evaluate_proposals(&[], &client()).unwrap();
        assert!(evaluation.winner.is_none());
    }

    #[test]
    fn test_replies_keep_conversation_and_come_from_initiator() {
        let evaluation = evaluate_proposals(&[propose("a", "1")], &client()).unwrap();
        let reply = evaluation.replies().next().unwrap();
        assert_eq!(reply.sender, client());
        assert_eq!(reply.conversation_id.as_deref(), Some("round-1"));
        assert_eq!(reply.content, "1");
    }

    #[test]
    fn test_malformed_bid_aborts() {
        for bad in ["", "ten", "1.5", " 3", "3 "] {
            let responses = vec![propose("a", "4"), propose("b", bad)];
            let err = evaluate_proposals(&responses, &client()).unwrap_err();
            assert!(
                matches!(err, NegotiationError::MalformedBid { ref proposer, .. } if proposer.as_str() == "b"),
                "bid {bad:?} should be rejected"
            );
        }
    }
}
