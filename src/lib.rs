//! wasmboot - WASM frontend bootstrap
//!
//! Tries candidate builds of a WASM frontend in priority order (bundler
//! preload hints, a meta hint, then conventional `pkg/` paths), accepts the
//! first one that loads, and renders a diagnostic fallback into the page's
//! mount point when none does.
//!
//! # Architecture
//!
//! - **candidates**: hint discovery and candidate ordering
//! - **probe**: HEAD existence and content type check
//! - **loader**: dynamic import plus best-effort initialization
//! - **orchestrator**: the sequential run and its state machine
//! - **render**: the fallback UI and enhancement activation
//! - **host**: the HTTP-backed environment used by the CLI

pub mod errors;
pub mod types;
pub mod guard;
pub mod context;
pub mod candidates;
pub mod probe;
pub mod loader;
pub mod orchestrator;
pub mod render;

// Re-export commonly used types
pub use errors::{BootError, Result};
pub use orchestrator::{BootOutcome, BootReport, BootstrapOrchestrator};

// Native environment, diagnostics and CLI support
pub mod host;
pub mod doctor;
pub mod telemetry;
pub mod cli;
pub mod config;
pub mod logging;
