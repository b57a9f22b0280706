//! Bootstrap state machine
//!
//! One run walks these states candidate by candidate:
//! - Idle → Probing → Loading → Initializing → Accepted
//! - a rejected probe or failed import drops back to Idle for the next candidate
//! - Idle with no candidates left → Exhausted → FallbackRendered
//!
//! Accepted and FallbackRendered are terminal; any further event is an error,
//! which is what guarantees no candidate is tried after the first acceptance.

use crate::errors::{BootError, Result};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Bootstrap run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BootState {
    /// Between candidates (or before the first one)
    Idle,

    /// HEAD check in flight
    Probing,

    /// Dynamic import in flight
    Loading,

    /// Best-effort initializer and start calls
    Initializing,

    /// A candidate loaded (terminal)
    Accepted,

    /// Every candidate was rejected
    Exhausted,

    /// Diagnostic UI written to the mount point (terminal)
    FallbackRendered,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootEvent {
    BeginCandidate,
    ProbePassed,
    ProbeRejected,
    ImportSucceeded,
    ImportFailed,
    InitSettled,
    CandidatesExhausted,
    FallbackComplete,
}

impl BootState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootState::Accepted | BootState::FallbackRendered)
    }

    /// Transition function. Terminal states accept no events.
    pub fn transition(&self, event: BootEvent) -> Result<BootState> {
        use BootEvent::*;
        use BootState::*;

        let next = match (self, event) {
            (Idle, BeginCandidate) => Probing,
            (Idle, CandidatesExhausted) => Exhausted,

            (Probing, ProbePassed) => Loading,
            (Probing, ProbeRejected) => Idle,

            (Loading, ImportSucceeded) => Initializing,
            (Loading, ImportFailed) => Idle,

            (Initializing, InitSettled) => Accepted,

            (Exhausted, FallbackComplete) => FallbackRendered,

            (from, event) => {
                return Err(BootError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BootState::Idle => "Idle",
            BootState::Probing => "Probing",
            BootState::Loading => "Loading",
            BootState::Initializing => "Initializing",
            BootState::Accepted => "Accepted",
            BootState::Exhausted => "Exhausted",
            BootState::FallbackRendered => "Fallback rendered",
        }
    }
}

/// Current state plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct BootMachine {
    state: BootState,
    history: Vec<BootState>,
    telemetry: Option<TelemetryCollector>,
}

impl Default for BootMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BootMachine {
    pub fn new() -> Self {
        Self {
            state: BootState::Idle,
            history: vec![BootState::Idle],
            telemetry: None,
        }
    }

    pub fn with_telemetry(telemetry: TelemetryCollector) -> Self {
        Self {
            telemetry: Some(telemetry),
            ..Self::new()
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    /// Every state visited, starting with Idle
    pub fn history(&self) -> &[BootState] {
        &self.history
    }

    /// Apply an event, leaving the state unchanged if it is invalid
    pub fn fire(&mut self, event: BootEvent) -> Result<BootState> {
        let next = self.state.transition(event)?;

        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::StateTransition {
                from: self.state,
                to: next,
                timestamp: Instant::now(),
            });
        }

        self.state = next;
        self.history.push(next);
        Ok(next)
    }

    /// Like [`fire`](Self::fire), but an invalid event is only logged
    pub fn observe(&mut self, event: BootEvent) {
        if let Err(e) = self.fire(event) {
            log::error!("{}", e);
        }
    }
}
