//! Telemetry for bootstrap runs
//!
//! Collects per-run events (state changes, probe verdicts, initializer
//! attempts, enhancement activations) and prints a terminal summary.

use crate::orchestrator::BootState;
use colored::Colorize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    StateTransition {
        from: BootState,
        to: BootState,
        timestamp: Instant,
    },

    // Candidate events
    CandidateProbed {
        candidate: String,
        accepted: bool,
        timestamp: Instant,
    },
    CandidateRejected {
        candidate: String,
        reason: String,
        timestamp: Instant,
    },
    CandidateAccepted {
        candidate: String,
        duration_ms: u64,
        timestamp: Instant,
    },
    InitAttempt {
        candidate: String,
        entry_point: String,
        binary_path: Option<String>,
        success: bool,
        timestamp: Instant,
    },

    // Fallback events
    FallbackRendered {
        timestamp: Instant,
    },
    EnhancementActivated {
        library: String,
        success: bool,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub state_transitions: usize,
    pub candidates_probed: usize,
    pub candidates_rejected: usize,
    pub candidates_accepted: usize,
    pub init_attempts: usize,
    pub init_failures: usize,
    pub fallbacks_rendered: usize,
    pub enhancements_activated: usize,
    pub enhancement_failures: usize,
}

/// Telemetry collector
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::StateTransition { .. } => {
                    stats.state_transitions += 1;
                }
                TelemetryEvent::CandidateProbed { .. } => {
                    stats.candidates_probed += 1;
                }
                TelemetryEvent::CandidateRejected { .. } => {
                    stats.candidates_rejected += 1;
                }
                TelemetryEvent::CandidateAccepted { .. } => {
                    stats.candidates_accepted += 1;
                }
                TelemetryEvent::InitAttempt { success, .. } => {
                    stats.init_attempts += 1;
                    if !*success {
                        stats.init_failures += 1;
                    }
                }
                TelemetryEvent::FallbackRendered { .. } => {
                    stats.fallbacks_rendered += 1;
                }
                TelemetryEvent::EnhancementActivated { success, .. } => {
                    if *success {
                        stats.enhancements_activated += 1;
                    } else {
                        stats.enhancement_failures += 1;
                    }
                }
            }
        }

        lock(&self.events).push(event);
    }

    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        if !self.verbosity.show_progress() {
            return;
        }

        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("\n{}", "Bootstrap Summary".bold());
        println!("─────────────────────────────────────");
        println!("Duration:            {:?}", elapsed);
        println!("Candidates probed:   {}", stats.candidates_probed);
        println!("Candidates rejected: {}", stats.candidates_rejected);
        println!("Init attempts:       {} ({} failed)", stats.init_attempts, stats.init_failures);
        if stats.fallbacks_rendered > 0 {
            println!(
                "Enhancements:        {} activated, {} failed",
                stats.enhancements_activated, stats.enhancement_failures
            );
        }

        if self.verbosity.show_events() {
            println!("State transitions:   {}", stats.state_transitions);
            for event in self.collector.recent_events(usize::MAX) {
                if let TelemetryEvent::CandidateRejected { candidate, reason, .. } = event {
                    println!("  {} {} ({})", "✗".red(), candidate, reason.dimmed());
                }
            }
        }
        println!();
    }
}
