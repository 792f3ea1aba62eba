//! Per-agent execution context
//!
//! Bundles what an actor needs to take part in the market: its identity,
//! its mailbox, the postman for outgoing traffic and the injected world
//! clock together with a tick subscription taken when the agent joined.

use tokio::sync::broadcast;
use tracing::warn;

use super::mailbox::Mailbox;
use super::message::Message;
use super::postman::SharedPostman;
use super::template::MessageTemplate;
use super::TransportError;
use crate::clock::{ClockTick, Day, SharedClock};
use crate::identity::AgentId;

/// Something an agent loop has to react to
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Tick(ClockTick),
    Message(Message),
}

/// Identity, mailbox, transport and clock of one agent
pub struct AgentContext {
    id: AgentId,
    mailbox: Mailbox,
    postman: SharedPostman,
    clock: SharedClock,
    ticks: broadcast::Receiver<ClockTick>,
}

impl AgentContext {
    /// Register `id` with the postman and subscribe to the clock
    pub fn join(
        id: AgentId,
        postman: SharedPostman,
        clock: SharedClock,
    ) -> Result<Self, TransportError> {
        let mailbox = postman.register(id.clone())?;
        let ticks = clock.subscribe();
        Ok(Self {
            id,
            mailbox,
            postman,
            clock,
            ticks,
        })
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn today(&self) -> Day {
        self.clock.current_day()
    }

    /// Most recent tick announced by the clock, if it has started
    pub fn last_tick(&self) -> Option<ClockTick> {
        self.clock.last_tick()
    }

    pub fn mailbox(&mut self) -> &mut Mailbox {
        &mut self.mailbox
    }

    /// Send a message; returns how many receivers got it
    pub fn send(&self, message: Message) -> usize {
        self.postman.send(message)
    }

    /// Wait for the next clock tick; `None` once the clock is gone.
    ///
    /// Ticks dropped because this agent fell too far behind are logged and
    /// skipped.
    pub async fn next_tick(&mut self) -> Option<ClockTick> {
        loop {
            match self.ticks.recv().await {
                Ok(tick) => return Some(tick),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(agent = %self.id, skipped, "Agent lagged behind the clock");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait for whichever comes first: a message matching `template` or the
    /// next clock tick. Messages already waiting are served before ticks.
    pub async fn next_event(
        &mut self,
        template: &MessageTemplate,
    ) -> Result<AgentEvent, TransportError> {
        let Self {
            id, mailbox, ticks, ..
        } = self;

        loop {
            tokio::select! {
                biased;
                message = mailbox.receive(template) => {
                    return message.map(AgentEvent::Message);
                }
                tick = ticks.recv() => match tick {
                    Ok(tick) => return Ok(AgentEvent::Tick(tick)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(agent = %id, skipped, "Agent lagged behind the clock");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(TransportError::ClockStopped);
                    }
                },
            }
        }
    }
}

impl Drop for AgentContext {
    fn drop(&mut self) {
        self.postman.unregister(&self.id);
    }
}
