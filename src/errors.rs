//! Error types for wasmboot
//!
//! Every fallible seam (network, module host, configuration, state machine)
//! reports through `BootError`. The bootstrap boundary converts these into
//! candidate rejections; nothing here ever reaches the page.

use thiserror::Error;

/// Main error type for the bootstrap system
#[derive(Error, Debug)]
pub enum BootError {
    /// State machine transition errors
    #[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Dynamic import of a candidate module failed
    #[error("Module import failed for {location}: {reason}")]
    ModuleImport { location: String, reason: String },

    /// Default initializer or start entry point failed
    #[error("Module initialization failed: {0}")]
    Initialization(String),

    /// Optional enhancement library failed on activation
    #[error("Enhancement '{library}' failed to activate: {reason}")]
    Enhancement { library: String, reason: String },

    /// Guarded call panicked instead of returning an error
    #[error("Guarded call panicked: {0}")]
    Panicked(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL resolution errors
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("Bootstrap error: {0}")]
    Generic(String),
}

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, BootError>;

/// Convert anyhow errors to BootError
impl From<anyhow::Error> for BootError {
    fn from(err: anyhow::Error) -> Self {
        BootError::Generic(err.to_string())
    }
}
