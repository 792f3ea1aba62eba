//! Simulation clock
//!
//! The world clock alternates night and day phases and broadcasts each
//! phase change to every subscribed actor. For day `d` the clock announces
//! `Night(d)` (settlement of the day's work) and then `Day(d)` (planning
//! window that closes the day), after which `Night(d + 1)` follows.
//!
//! The clock is handed to actors explicitly through their context; there is
//! no global instance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// Index of a simulated day
pub type Day = u32;

/// Channel capacity for tick broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Half of a simulated day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Night,
    Day,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Night => write!(f, "night"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// One phase change announced by the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTick {
    pub day: Day,
    pub phase: Phase,
    pub timestamp: DateTime<Utc>,
}

impl ClockTick {
    fn following(previous: Option<ClockTick>, start_day: Day) -> (Day, Phase) {
        match previous {
            None => (start_day, Phase::Night),
            Some(tick) => match tick.phase {
                Phase::Night => (tick.day, Phase::Day),
                Phase::Day => (tick.day.saturating_add(1), Phase::Night),
            },
        }
    }
}

/// Subject tags used to route market traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Hiring handshake between a technician and its company
    Employment,
    /// Nightly salary settlement
    Payment,
    /// Contract renewal offers
    Offer,
    /// Repair jobs put out for bids
    Repairs,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employment => "employment",
            Self::Payment => "payment",
            Self::Offer => "offer",
            Self::Repairs => "repairs",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared reference to WorldClock
pub type SharedClock = Arc<WorldClock>;

/// Day/night clock broadcasting phase changes
pub struct WorldClock {
    sender: broadcast::Sender<ClockTick>,
    start_day: Day,
    current_day: AtomicU32,
    last_tick: Mutex<Option<ClockTick>>,
}

impl WorldClock {
    /// Create a clock whose first tick will be the night of `start_day`
    pub fn new(start_day: Day) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            start_day,
            current_day: AtomicU32::new(start_day),
            last_tick: Mutex::new(None),
        }
    }

    /// Create a shared reference to this clock
    pub fn shared(self) -> SharedClock {
        Arc::new(self)
    }

    /// Day index of the most recent tick (the start day before any tick)
    pub fn current_day(&self) -> Day {
        self.current_day.load(Ordering::SeqCst)
    }

    /// The most recent tick, if the clock has started
    pub fn last_tick(&self) -> Option<ClockTick> {
        *self
            .last_tick
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to phase changes emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ClockTick> {
        self.sender.subscribe()
    }

    /// Move to the next phase and announce it
    pub fn advance(&self) -> ClockTick {
        let mut last = self
            .last_tick
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (day, phase) = ClockTick::following(*last, self.start_day);
        let tick = ClockTick {
            day,
            phase,
            timestamp: Utc::now(),
        };
        *last = Some(tick);
        self.current_day.store(day, Ordering::SeqCst);

        // No subscribers is fine; nobody is waiting for this phase
        match self.sender.send(tick) {
            Ok(receivers) => debug!(day, %phase, receivers, "Clock advanced"),
            Err(_) => debug!(day, %phase, "Clock advanced (no subscribers)"),
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_sequence() {
        let clock = WorldClock::new(3);
        assert_eq!(clock.current_day(), 3);
        assert!(clock.last_tick().is_none());

        let phases: Vec<(Day, Phase)> = (0..5)
            .map(|_| {
                let tick = clock.advance();
                (tick.day, tick.phase)
            })
            .collect();

        assert_eq!(
            phases,
            vec![
                (3, Phase::Night),
                (3, Phase::Day),
                (4, Phase::Night),
                (4, Phase::Day),
                (5, Phase::Night),
            ]
        );
        assert_eq!(clock.current_day(), 5);
    }

    #[test]
    fn test_last_day_does_not_wrap() {
        let clock = WorldClock::new(Day::MAX);
        clock.advance();
        clock.advance();
        let tick = clock.advance();
        assert_eq!((tick.day, tick.phase), (Day::MAX, Phase::Night));
    }

    #[tokio::test]
    async fn test_subscribers_receive_ticks_in_order() {
        let clock = WorldClock::new(0).shared();
        let mut rx = clock.subscribe();

        clock.advance();
        clock.advance();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.day, first.phase), (0, Phase::Night));
        assert_eq!((second.day, second.phase), (0, Phase::Day));
    }

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::Employment.to_string(), "employment");
        assert_eq!(Topic::Payment.as_str(), "payment");
        assert_eq!(serde_json::to_string(&Topic::Offer).unwrap(), "\"offer\"");
    }
}
