//! Heartbeat bookkeeping
//!
//! Tracks the server-assigned interval and whether the last beat was acknowledged.
//! The manager asks it what to do whenever the deadline passes.

use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a heartbeat deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Send a beat; the next deadline is already armed
    Send,
    /// The previous beat was never acknowledged
    Zombie,
}

/// Heartbeat timer state for one socket
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    next_at: Instant,
    acknowledged: bool,
}

impl Heartbeat {
    /// Arm the first deadline one interval from `now`
    ///
    /// Starts acknowledged since nothing has been sent yet.
    #[must_use]
    pub fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_at: now + interval,
            acknowledged: true,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_at(&self) -> Instant {
        self.next_at
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Handle a passed deadline
    ///
    /// On `Send` the flag drops to unacknowledged and the next deadline is armed.
    /// On `Zombie` nothing changes; the caller tears the heartbeat down.
    pub fn tick(&mut self, now: Instant) -> HeartbeatTick {
        if !self.acknowledged {
            return HeartbeatTick::Zombie;
        }
        self.acknowledged = false;
        self.next_at = now + self.interval;
        HeartbeatTick::Send
    }

    /// Record a HEARTBEAT_ACK
    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }
}
