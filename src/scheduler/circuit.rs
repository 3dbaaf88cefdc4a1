//! Circuit breaker guarding the scheduling cycle.
//!
//! Closed (normal polling), Open (scheduling suspended until the cooldown
//! elapses) and HalfOpen (one trial cycle with a reduced batch). There is no
//! terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Scheduler circuit states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - every cycle polls for work
    Closed,
    /// Failure mode - cycles are skipped until the cooldown elapses
    Open,
    /// Testing recovery - one cycle with a reduced batch
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// A state change caused by a cycle result or by the cooldown elapsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitTransition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Single-owner circuit state machine
///
/// Uses tokio's clock so cooldowns follow a paused test runtime.
#[derive(Debug)]
pub struct SchedulerCircuit {
    state: CircuitState,
    consecutive_failures: u32,
    failure_threshold: u32,
    cooldown: Duration,
    opened_at: Option<Instant>,
}

impl SchedulerCircuit {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        info!(
            failure_threshold = failure_threshold,
            cooldown_seconds = cooldown.as_secs(),
            "🛡️ Scheduler circuit initialized"
        );

        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            failure_threshold: failure_threshold.max(1),
            cooldown,
            opened_at: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Time left before an open circuit may be tried again
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        match (self.state, self.opened_at) {
            (CircuitState::Open, Some(opened_at)) => {
                Some(self.cooldown.saturating_sub(now.duration_since(opened_at)))
            }
            _ => None,
        }
    }

    /// Move an open circuit to HalfOpen once its cooldown has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<CircuitTransition> {
        if self.state != CircuitState::Open {
            return None;
        }

        match self.opened_at {
            Some(opened_at) if now.duration_since(opened_at) < self.cooldown => None,
            Some(_) => Some(self.transition(CircuitState::HalfOpen)),
            None => {
                warn!("Scheduler circuit open but no timestamp recorded");
                Some(self.transition(CircuitState::HalfOpen))
            }
        }
    }

    pub fn record_success(&mut self) -> Option<CircuitTransition> {
        self.consecutive_failures = 0;

        match self.state {
            CircuitState::HalfOpen => {
                self.opened_at = None;
                Some(self.transition(CircuitState::Closed))
            }
            CircuitState::Closed => None,
            CircuitState::Open => {
                warn!("Success recorded while scheduler circuit is open");
                None
            }
        }
    }

    pub fn record_failure(&mut self, now: Instant) -> Option<CircuitTransition> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        error!(
            consecutive_failures = self.consecutive_failures,
            failure_threshold = self.failure_threshold,
            "🔴 Scheduler cycle failed"
        );

        match self.state {
            CircuitState::Closed if self.consecutive_failures >= self.failure_threshold => {
                self.opened_at = Some(now);
                Some(self.transition(CircuitState::Open))
            }
            CircuitState::HalfOpen => {
                // Failed trial: restart the cooldown
                self.opened_at = Some(now);
                Some(self.transition(CircuitState::Open))
            }
            _ => None,
        }
    }

    fn transition(&mut self, to: CircuitState) -> CircuitTransition {
        let from = self.state;
        self.state = to;

        match to {
            CircuitState::Open => warn!(
                from = %from,
                consecutive_failures = self.consecutive_failures,
                cooldown_seconds = self.cooldown.as_secs(),
                "🔴 Scheduler circuit OPENED"
            ),
            CircuitState::HalfOpen => info!(from = %from, "🟡 Scheduler circuit HALF-OPEN"),
            CircuitState::Closed => info!(from = %from, "🟢 Scheduler circuit CLOSED"),
        }
        debug!(from = %from, to = %to, "Scheduler circuit transition");

        CircuitTransition { from, to }
    }
}
