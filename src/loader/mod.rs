//! Dynamic load of a candidate module
//!
//! Acceptance is decided by the import alone. The default initializer and the
//! `start` entry point are called afterwards on a best-effort basis; their
//! outcome is reported but never turns an imported module into a rejection.

use crate::errors::Result;
use crate::guard::attempt;
use crate::orchestrator::{BootEvent, BootMachine};
use crate::probe::{ModuleProbe, ProbeVerdict};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Default script suffix replaced when deriving the binary artifact
pub const DEFAULT_SCRIPT_SUFFIX: &str = ".js";

/// Default binary artifact suffix
pub const DEFAULT_BINARY_SUFFIX: &str = "_bg.wasm";

/// A module that finished importing
#[async_trait]
pub trait LoadedModule: Send + Sync {
    /// Whether the module exports a callable default initializer
    fn has_default_initializer(&self) -> bool;

    /// Call the default initializer, optionally with a binary artifact path
    async fn call_default(&self, binary_path: Option<&str>) -> Result<()>;

    /// Whether the module exports a callable `start`
    fn has_start(&self) -> bool;

    async fn call_start(&self) -> Result<()>;
}

/// Performs dynamic imports
#[async_trait]
pub trait ModuleHost: Send + Sync {
    async fn import(&self, location: &str) -> Result<Box<dyn LoadedModule>>;
}

/// What a best-effort entry point call did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitStep {
    /// Not exported by the module
    Absent,
    Succeeded,
    /// First call failed, retry with the derived binary path worked
    RecoveredWithBinaryPath(String),
    /// Every call failed; the failure was swallowed
    Failed,
}

impl InitStep {
    pub fn is_failed(&self) -> bool {
        matches!(self, InitStep::Failed)
    }
}

/// Outcome of the initializer and start calls of an accepted module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitReport {
    pub default_init: InitStep,
    pub start: InitStep,
}

impl InitReport {
    /// Loaded, but something the module exports did not run cleanly
    pub fn is_partial(&self) -> bool {
        self.default_init.is_failed() || self.start.is_failed()
    }
}

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    Probe(ProbeVerdict),
    Import(String),
}

impl Rejection {
    pub fn describe(&self) -> String {
        match self {
            Rejection::Probe(verdict) => verdict.describe(),
            Rejection::Import(reason) => format!("import failed: {}", reason),
        }
    }
}

/// Result of one candidate's load protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadOutcome {
    Accepted(InitReport),
    Rejected(Rejection),
}

impl LoadOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LoadOutcome::Accepted(_))
    }
}

/// Replace the trailing script suffix with the binary artifact suffix.
///
/// `pkg/app.js` becomes `pkg/app_bg.wasm`; a location without the script
/// suffix is returned unchanged.
pub fn derive_binary_path(location: &str, script_suffix: &str, binary_suffix: &str) -> String {
    match location.strip_suffix(script_suffix) {
        Some(stem) if !script_suffix.is_empty() => format!("{}{}", stem, binary_suffix),
        _ => location.to_string(),
    }
}

/// Probe, import and initialize one candidate
#[derive(Clone)]
pub struct ModuleLoader {
    probe: ModuleProbe,
    host: Arc<dyn ModuleHost>,
    script_suffix: String,
    binary_suffix: String,
    telemetry: Option<TelemetryCollector>,
}

impl ModuleLoader {
    pub fn new(probe: ModuleProbe, host: Arc<dyn ModuleHost>) -> Self {
        Self {
            probe,
            host,
            script_suffix: DEFAULT_SCRIPT_SUFFIX.to_string(),
            binary_suffix: DEFAULT_BINARY_SUFFIX.to_string(),
            telemetry: None,
        }
    }

    pub fn with_suffixes(mut self, script_suffix: &str, binary_suffix: &str) -> Self {
        self.script_suffix = script_suffix.to_string();
        self.binary_suffix = binary_suffix.to_string();
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Accept (true) or reject (false) a candidate. Never fails.
    pub async fn load(&self, candidate: &str) -> bool {
        let mut machine = BootMachine::new();
        self.load_tracked(candidate, &mut machine).await.is_accepted()
    }

    /// Run the load protocol, driving `machine` through its states.
    ///
    /// `machine` must be Idle on entry; it ends Idle on rejection and Accepted
    /// on success.
    pub async fn load_tracked(&self, candidate: &str, machine: &mut BootMachine) -> LoadOutcome {
        let started = Instant::now();
        machine.observe(BootEvent::BeginCandidate);

        let verdict = self.probe.inspect(candidate).await;
        self.record(TelemetryEvent::CandidateProbed {
            candidate: candidate.to_string(),
            accepted: verdict.is_accepted(),
            timestamp: Instant::now(),
        });
        if !verdict.is_accepted() {
            machine.observe(BootEvent::ProbeRejected);
            return self.reject(candidate, Rejection::Probe(verdict));
        }
        machine.observe(BootEvent::ProbePassed);

        let module = match self.host.import(candidate).await {
            Ok(module) => module,
            Err(e) => {
                machine.observe(BootEvent::ImportFailed);
                return self.reject(candidate, Rejection::Import(e.to_string()));
            }
        };
        machine.observe(BootEvent::ImportSucceeded);

        let report = InitReport {
            default_init: self.run_default_initializer(candidate, module.as_ref()).await,
            start: self.run_start(candidate, module.as_ref()).await,
        };
        if report.is_partial() {
            log::warn!(
                "{} loaded but did not initialize cleanly (init: {:?}, start: {:?})",
                candidate,
                report.default_init,
                report.start
            );
        }
        machine.observe(BootEvent::InitSettled);

        self.record(TelemetryEvent::CandidateAccepted {
            candidate: candidate.to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Instant::now(),
        });
        LoadOutcome::Accepted(report)
    }

    async fn run_default_initializer(&self, candidate: &str, module: &dyn LoadedModule) -> InitStep {
        if !module.has_default_initializer() {
            return InitStep::Absent;
        }

        let first = attempt("default initializer", module.call_default(None)).await;
        self.record_init(candidate, "default", None, first.is_ok());
        if first.is_ok() {
            return InitStep::Succeeded;
        }

        let binary_path = derive_binary_path(candidate, &self.script_suffix, &self.binary_suffix);
        let retry = attempt(
            "default initializer retry",
            module.call_default(Some(&binary_path)),
        )
        .await;
        self.record_init(candidate, "default", Some(&binary_path), retry.is_ok());
        match retry {
            Ok(()) => InitStep::RecoveredWithBinaryPath(binary_path),
            Err(()) => InitStep::Failed,
        }
    }

    async fn run_start(&self, candidate: &str, module: &dyn LoadedModule) -> InitStep {
        if !module.has_start() {
            return InitStep::Absent;
        }

        let result = attempt("start", module.call_start()).await;
        self.record_init(candidate, "start", None, result.is_ok());
        match result {
            Ok(()) => InitStep::Succeeded,
            Err(()) => InitStep::Failed,
        }
    }

    fn reject(&self, candidate: &str, rejection: Rejection) -> LoadOutcome {
        log::debug!("candidate {} rejected: {}", candidate, rejection.describe());
        self.record(TelemetryEvent::CandidateRejected {
            candidate: candidate.to_string(),
            reason: rejection.describe(),
            timestamp: Instant::now(),
        });
        LoadOutcome::Rejected(rejection)
    }

    fn record_init(&self, candidate: &str, entry_point: &str, binary_path: Option<&str>, success: bool) {
        self.record(TelemetryEvent::InitAttempt {
            candidate: candidate.to_string(),
            entry_point: entry_point.to_string(),
            binary_path: binary_path.map(str::to_string),
            success,
            timestamp: Instant::now(),
        });
    }

    fn record(&self, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(event);
        }
    }
}
