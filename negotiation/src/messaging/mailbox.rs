//! Per-agent mailbox with template-based receive.
//!
//! Incoming messages arrive on an unbounded channel. Messages that do not
//! match the template currently being waited on are parked in a local queue,
//! in arrival order, until some later receive asks for them. Waiting is
//! channel-driven: a blocked receive wakes only when a new message lands.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::message::Message;
use super::template::MessageTemplate;
use super::TransportError;
use crate::identity::AgentId;

/// The receiving end of an agent's message queue
pub struct Mailbox {
    owner: AgentId,
    rx: mpsc::UnboundedReceiver<Message>,
    pending: VecDeque<Message>,
}

impl Mailbox {
    pub(crate) fn new(owner: AgentId, rx: mpsc::UnboundedReceiver<Message>) -> Self {
        Self {
            owner,
            rx,
            pending: VecDeque::new(),
        }
    }

    pub fn owner(&self) -> &AgentId {
        &self.owner
    }

    /// Number of received messages not yet taken by any receive
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take the oldest matching message without waiting
    pub fn try_receive(&mut self, template: &MessageTemplate) -> Option<Message> {
        while let Ok(message) = self.rx.try_recv() {
            self.pending.push_back(message);
        }
        self.take_pending(template)
    }

    /// Wait for the oldest matching message.
    ///
    /// Cancel safe: a message pulled off the channel is either returned or
    /// parked before the next await point.
    pub async fn receive(&mut self, template: &MessageTemplate) -> Result<Message, TransportError> {
        if let Some(message) = self.take_pending(template) {
            return Ok(message);
        }

        loop {
            match self.rx.recv().await {
                Some(message) if template.matches(&message) => return Ok(message),
                Some(message) => self.pending.push_back(message),
                None => return Err(TransportError::MailboxClosed(self.owner.clone())),
            }
        }
    }

    /// Wait for a matching message until `deadline`; `Ok(None)` on timeout
    pub async fn receive_until(
        &mut self,
        template: &MessageTemplate,
        deadline: Instant,
    ) -> Result<Option<Message>, TransportError> {
        match tokio::time::timeout_at(deadline, self.receive(template)).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Drop every received message matching `template`; returns how many
    pub fn discard(&mut self, template: &MessageTemplate) -> usize {
        while let Ok(message) = self.rx.try_recv() {
            self.pending.push_back(message);
        }
        let before = self.pending.len();
        self.pending.retain(|m| !template.matches(m));
        before - self.pending.len()
    }

    fn take_pending(&mut self, template: &MessageTemplate) -> Option<Message> {
        let index = self.pending.iter().position(|m| template.matches(m))?;
        self.pending.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Topic;
    use crate::messaging::Performative;
    use std::time::Duration;

    fn mailbox() -> (Mailbox, mpsc::UnboundedSender<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Mailbox::new("tech-1".into(), rx), tx)
    }

    fn msg(performative: Performative, topic: Topic, content: &str) -> Message {
        Message::new(performative, "company".into())
            .topic(topic)
            .content(content)
    }

    #[tokio::test]
    async fn test_receive_skips_and_parks_non_matching() {
        let (mut mailbox, tx) = mailbox();
        tx.send(msg(Performative::Inform, Topic::Offer, "offer")).unwrap();
        tx.send(msg(Performative::Inform, Topic::Payment, "pay-1")).unwrap();

        let template = MessageTemplate::any().topic(Topic::Payment);
        let received = mailbox.receive(&template).await.unwrap();
        assert_eq!(received.content, "pay-1");
        assert_eq!(mailbox.pending_len(), 1);

        let parked = mailbox
            .try_receive(&MessageTemplate::any().topic(Topic::Offer))
            .unwrap();
        assert_eq!(parked.content, "offer");
        assert_eq!(mailbox.pending_len(), 0);
    }

    #[test]
    fn test_discard_drops_only_matching() {
        let (mut mailbox, tx) = mailbox();
        tx.send(msg(Performative::Propose, Topic::Repairs, "late bid")).unwrap();
        tx.send(msg(Performative::Inform, Topic::Payment, "pay-0")).unwrap();
        tx.send(msg(Performative::Inform, Topic::Repairs, "late result")).unwrap();

        let dropped = mailbox.discard(&MessageTemplate::any().topic(Topic::Repairs));
        assert_eq!(dropped, 2);
        assert_eq!(mailbox.pending_len(), 1);
        assert_eq!(
            mailbox.try_receive(&MessageTemplate::any()).map(|m| m.content),
            Some("pay-0".to_string())
        );
    }

    #[tokio::test]
    async fn test_matching_messages_come_out_in_arrival_order() {
        let (mut mailbox, tx) = mailbox();
        for i in 0..3 {
            tx.send(msg(Performative::Inform, Topic::Offer, "noise")).unwrap();
            tx.send(msg(Performative::Inform, Topic::Payment, &format!("pay-{i}")))
                .unwrap();
        }

        let template = MessageTemplate::any().topic(Topic::Payment);
        for i in 0..3 {
            let received = mailbox.receive(&template).await.unwrap();
            assert_eq!(received.content, format!("pay-{i}"));
        }
        assert_eq!(mailbox.pending_len(), 3);
    }

    #[tokio::test]
    async fn test_try_receive_returns_none_when_nothing_matches() {
        let (mut mailbox, tx) = mailbox();
        tx.send(msg(Performative::Inform, Topic::Offer, "offer")).unwrap();
        assert!(mailbox
            .try_receive(&MessageTemplate::any().topic(Topic::Payment))
            .is_none());
        assert_eq!(mailbox.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_receive_wakes_on_late_message() {
        let (mut mailbox, tx) = mailbox();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            tx.send(msg(Performative::Inform, Topic::Payment, "late")).unwrap();
        });

        let template = MessageTemplate::any().topic(Topic::Payment);
        let received = mailbox.receive(&template).await.unwrap();
        assert_eq!(received.content, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_until_times_out() {
        let (mut mailbox, _tx) = mailbox();
        let deadline = Instant::now() + Duration::from_millis(500);
        let result = mailbox
            .receive_until(&MessageTemplate::any(), deadline)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_closed_channel_is_reported() {
        let (mut mailbox, tx) = mailbox();
        drop(tx);
        let err = mailbox.receive(&MessageTemplate::any()).await.unwrap_err();
        assert!(matches!(err, TransportError::MailboxClosed(id) if id.as_str() == "tech-1"));
    }

    #[tokio::test]
    async fn test_parked_messages_survive_channel_close() {
        let (mut mailbox, tx) = mailbox();
        tx.send(msg(Performative::Inform, Topic::Offer, "offer")).unwrap();
        drop(tx);

        let template = MessageTemplate::any().topic(Topic::Payment);
        assert!(mailbox.receive(&template).await.is_err());

        let parked = mailbox.receive(&MessageTemplate::any()).await.unwrap();
        assert_eq!(parked.content, "offer");
    }
}
