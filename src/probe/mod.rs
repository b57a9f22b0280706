//! Lightweight existence and type check for a candidate
//!
//! A HEAD request decides whether a candidate is worth a full import. Hosting
//! setups that label scripts as `text/plain` are tolerated; anything else that
//! is not a script type is rejected.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Content type fragments accepted for a module script
pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 3] = ["javascript", "ecmascript", "text/plain"];

/// Status and declared type from a HEAD request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ProbeResponse {
    pub fn new(status: u16, content_type: Option<&str>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network seam used for existence checks
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Issue a HEAD request for `location`
    async fn head(&self, location: &str) -> Result<ProbeResponse>;
}

/// Why a candidate was or was not accepted by the probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeVerdict {
    Accepted { status: u16, content_type: String },
    Unreachable(String),
    BadStatus(u16),
    WrongContentType(String),
}

impl ProbeVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProbeVerdict::Accepted { .. })
    }

    /// Short description for logs and diagnostics
    pub fn describe(&self) -> String {
        match self {
            ProbeVerdict::Accepted { status, content_type } => {
                format!("HTTP {} ({})", status, content_type)
            }
            ProbeVerdict::Unreachable(reason) => format!("unreachable: {}", reason),
            ProbeVerdict::BadStatus(status) => format!("HTTP {}", status),
            ProbeVerdict::WrongContentType(ct) if ct.is_empty() => {
                "no content type declared".to_string()
            }
            ProbeVerdict::WrongContentType(ct) => format!("unexpected content type '{}'", ct),
        }
    }
}

/// HEAD-based candidate check
#[derive(Clone)]
pub struct ModuleProbe {
    client: std::sync::Arc<dyn ResourceClient>,
    allowed_content_types: Vec<String>,
}

impl ModuleProbe {
    pub fn new(client: std::sync::Arc<dyn ResourceClient>) -> Self {
        Self::with_allowed(
            client,
            DEFAULT_ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_allowed(
        client: std::sync::Arc<dyn ResourceClient>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            client,
            allowed_content_types,
        }
    }

    /// Accept or reject a candidate. Never fails.
    pub async fn probe(&self, candidate: &str) -> bool {
        self.inspect(candidate).await.is_accepted()
    }

    /// Full verdict for a candidate
    pub async fn inspect(&self, candidate: &str) -> ProbeVerdict {
        let response = match self.client.head(candidate).await {
            Ok(response) => response,
            Err(e) => return ProbeVerdict::Unreachable(e.to_string()),
        };

        if !response.is_success() {
            return ProbeVerdict::BadStatus(response.status);
        }

        let content_type = response.content_type.unwrap_or_default();
        if !self.is_allowed_content_type(&content_type) {
            return ProbeVerdict::WrongContentType(content_type);
        }

        ProbeVerdict::Accepted {
            status: response.status,
            content_type,
        }
    }

    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        self.allowed_content_types
            .iter()
            .any(|allowed| content_type.contains(allowed.as_str()))
    }
}
