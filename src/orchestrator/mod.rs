//! Bootstrap orchestration
//!
//! Builds the candidate list, tries candidates strictly one at a time, stops
//! at the first one that loads, and renders the fallback when none does.

pub mod state;

pub use state::{BootEvent, BootMachine, BootState};

use crate::candidates::CandidateSource;
use crate::config::Config;
use crate::context::Environment;
use crate::loader::{InitReport, LoadOutcome, ModuleLoader};
use crate::probe::ModuleProbe;
use crate::render::{Activation, FallbackRenderer};
use crate::telemetry::TelemetryCollector;
use crate::types::{Candidate, CandidateList};
use serde::{Deserialize, Serialize};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootOutcome {
    /// The document has no mount point; nothing was attempted
    NoMountPoint,

    /// A candidate loaded; the mount point was left untouched
    Accepted { candidate: Candidate, init: InitReport },

    /// Every candidate was rejected and the diagnostic UI was rendered
    FallbackRendered { activations: Vec<Activation> },
}

/// Record of one bootstrap run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootReport {
    pub outcome: BootOutcome,
    pub candidates: CandidateList,
    /// Candidates actually tried, with the reason each one was rejected
    pub attempts: Vec<(Candidate, Option<String>)>,
    pub final_state: BootState,
    pub history: Vec<BootState>,
}

impl BootReport {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, BootOutcome::Accepted { .. })
    }
}

/// Entry point of the bootstrap sequence
pub struct BootstrapOrchestrator {
    env: Environment,
    source: CandidateSource,
    loader: ModuleLoader,
    renderer: FallbackRenderer,
    defaults: Vec<String>,
    mount_id: String,
    telemetry: TelemetryCollector,
}

impl BootstrapOrchestrator {
    /// Wire the pipeline from an environment and configuration
    pub fn new(env: Environment, config: &Config) -> Self {
        let telemetry = TelemetryCollector::new();

        let probe = ModuleProbe::with_allowed(env.client.clone(), config.probe.allowed_content_types.clone());
        let loader = ModuleLoader::new(probe, env.host.clone())
            .with_suffixes(&config.candidates.script_suffix, &config.candidates.binary_suffix)
            .with_telemetry(telemetry.clone());
        let renderer = FallbackRenderer::new(
            config.enhancements.libraries.clone(),
            &config.enhancements.entry_point,
        )
        .with_telemetry(telemetry.clone());

        Self {
            source: CandidateSource::new(&config.page.meta_hint_name, &config.candidates.script_suffix),
            loader,
            renderer,
            defaults: config.candidates.defaults.clone(),
            mount_id: config.page.mount_id.clone(),
            telemetry,
            env,
        }
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Hints from the document followed by the defaults
    pub fn candidate_list(&self) -> CandidateList {
        self.source.candidate_list(self.env.document.as_ref(), &self.defaults)
    }

    /// Run the bootstrap sequence. Never fails.
    pub async fn run(&self) -> BootReport {
        let mut machine = BootMachine::with_telemetry(self.telemetry.clone());

        let mount = match self.env.document.mount_point(&self.mount_id) {
            Some(mount) => mount,
            None => {
                log::debug!("no element with id '{}', nothing to bootstrap", self.mount_id);
                return BootReport {
                    outcome: BootOutcome::NoMountPoint,
                    candidates: CandidateList::default(),
                    attempts: Vec::new(),
                    final_state: machine.state(),
                    history: machine.history().to_vec(),
                };
            }
        };

        let candidates = self.candidate_list();
        let mut attempts = Vec::new();

        for candidate in &candidates {
            match self.loader.load_tracked(candidate.as_str(), &mut machine).await {
                LoadOutcome::Accepted(init) => {
                    log::info!("WASM loaded from {}", candidate);
                    attempts.push((candidate.clone(), None));
                    return BootReport {
                        outcome: BootOutcome::Accepted {
                            candidate: candidate.clone(),
                            init,
                        },
                        candidates: candidates.clone(),
                        attempts,
                        final_state: machine.state(),
                        history: machine.history().to_vec(),
                    };
                }
                LoadOutcome::Rejected(rejection) => {
                    attempts.push((candidate.clone(), Some(rejection.describe())));
                }
            }
        }

        log::warn!(
            "none of {} candidates loaded, rendering fallback into #{}",
            candidates.len(),
            self.mount_id
        );
        machine.observe(BootEvent::CandidatesExhausted);
        let activations = self.renderer.render(&mount, self.env.globals.as_ref()).await;
        machine.observe(BootEvent::FallbackComplete);

        BootReport {
            outcome: BootOutcome::FallbackRendered { activations },
            candidates,
            attempts,
            final_state: machine.state(),
            history: machine.history().to_vec(),
        }
    }
}
