//! Doctor command for deployment diagnostics
//!
//! Walks the same candidate list the bootstrap would, but checks every entry
//! instead of stopping at the first, and looks at the binary artifact next to
//! each reachable script. Nothing is imported or rendered.

use crate::candidates::CandidateSource;
use crate::config::Config;
use crate::context::DocumentContext;
use crate::host::WASM_CONTENT_TYPE;
use crate::loader::derive_binary_path;
use crate::probe::{ModuleProbe, ProbeVerdict, ResourceClient};
use colored::Colorize;
use std::sync::Arc;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Deployment diagnostics
pub struct Doctor {
    document: Arc<dyn DocumentContext>,
    client: Arc<dyn ResourceClient>,
    config: Config,
}

impl Doctor {
    pub fn new(document: Arc<dyn DocumentContext>, client: Arc<dyn ResourceClient>, config: Config) -> Self {
        Self {
            document,
            client,
            config,
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_mount_point(), self.check_hints()];

        let source = CandidateSource::new(
            &self.config.page.meta_hint_name,
            &self.config.candidates.script_suffix,
        );
        let candidates = source.candidate_list(self.document.as_ref(), &self.config.candidates.defaults);
        let probe = ModuleProbe::with_allowed(
            self.client.clone(),
            self.config.probe.allowed_content_types.clone(),
        );

        let mut reachable = 0;
        for candidate in &candidates {
            let verdict = probe.inspect(candidate.as_str()).await;
            if verdict.is_accepted() {
                reachable += 1;
                checks.push(self.check_binary_artifact(candidate.as_str()).await);
            }
            checks.push(Self::candidate_check(candidate.as_str(), &verdict));
        }

        checks.push(if reachable > 0 {
            HealthCheck::new("Bootable", HealthStatus::Pass)
        } else {
            HealthCheck::new(
                "Bootable",
                HealthStatus::Fail(format!(
                    "none of {} candidates passed the probe; the fallback UI will render",
                    candidates.len()
                )),
            )
        });

        checks
    }

    fn check_mount_point(&self) -> HealthCheck {
        let id = &self.config.page.mount_id;
        match self.document.mount_point(id) {
            Some(_) => HealthCheck::new("Mount point", HealthStatus::Pass),
            None => HealthCheck::new(
                "Mount point",
                HealthStatus::Fail(format!("no element with id '{}'; bootstrap is a no-op", id)),
            ),
        }
    }

    fn check_hints(&self) -> HealthCheck {
        let source = CandidateSource::new(
            &self.config.page.meta_hint_name,
            &self.config.candidates.script_suffix,
        );
        let hints = source.discover_hints(self.document.as_ref());
        if hints.is_empty() {
            HealthCheck::new(
                "Build hints",
                HealthStatus::Warn("no modulepreload or meta hint; relying on defaults".to_string()),
            )
        } else {
            HealthCheck::new("Build hints", HealthStatus::Pass)
        }
    }

    fn candidate_check(candidate: &str, verdict: &ProbeVerdict) -> HealthCheck {
        let status = match verdict {
            ProbeVerdict::Accepted { content_type, .. } if content_type.contains("text/plain") => {
                HealthStatus::Warn(format!("served as '{}'; should be application/javascript", content_type))
            }
            ProbeVerdict::Accepted { .. } => HealthStatus::Pass,
            ProbeVerdict::WrongContentType(_) => HealthStatus::Fail(verdict.describe()),
            ProbeVerdict::BadStatus(_) | ProbeVerdict::Unreachable(_) => {
                HealthStatus::Warn(verdict.describe())
            }
        };
        HealthCheck::new(candidate, status)
    }

    async fn check_binary_artifact(&self, candidate: &str) -> HealthCheck {
        let binary = derive_binary_path(
            candidate,
            &self.config.candidates.script_suffix,
            &self.config.candidates.binary_suffix,
        );

        let status = match self.client.head(&binary).await {
            Ok(response) if !response.is_success() => {
                HealthStatus::Warn(format!("HTTP {}", response.status))
            }
            Ok(response) => match response.content_type.as_deref() {
                Some(ct) if ct.contains(WASM_CONTENT_TYPE) => HealthStatus::Pass,
                other => HealthStatus::Warn(format!(
                    "served as '{}', expected {}",
                    other.unwrap_or(""),
                    WASM_CONTENT_TYPE
                )),
            },
            Err(e) => HealthStatus::Warn(format!("unreachable: {}", e)),
        };
        HealthCheck::new(binary, status)
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "wasmboot deployment diagnostics".bold());
        println!("{:<40} Status", "Check");
        println!("{}", "=".repeat(70));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "PASS".green(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red(),
            };
            println!("{:<40} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LinkTag;
    use crate::errors::{BootError, Result};
    use crate::probe::ProbeResponse;
    use crate::render::{Element, MountPoint};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Page {
        mount: Option<MountPoint>,
    }

    impl DocumentContext for Page {
        fn location(&self) -> &str {
            "https://example.com/"
        }

        fn links(&self) -> Vec<LinkTag> {
            Vec::new()
        }

        fn meta_content(&self, _name: &str) -> Option<String> {
            None
        }

        fn mount_point(&self, _id: &str) -> Option<MountPoint> {
            self.mount.clone()
        }
    }

    struct Server(HashMap<&'static str, ProbeResponse>);

    #[async_trait]
    impl ResourceClient for Server {
        async fn head(&self, location: &str) -> Result<ProbeResponse> {
            self.0
                .get(location)
                .cloned()
                .ok_or_else(|| BootError::Generic("connection reset".to_string()))
        }
    }

    fn doctor(responses: Vec<(&'static str, ProbeResponse)>, mount: bool) -> Doctor {
        let page = Page {
            mount: mount.then(|| MountPoint::new(Element::new("div").with_id("root"))),
        };
        Doctor::new(
            Arc::new(page),
            Arc::new(Server(responses.into_iter().collect())),
            Config::default(),
        )
    }

    fn status_of<'a>(checks: &'a [HealthCheck], name: &str) -> &'a HealthStatus {
        &checks
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no check named {}", name))
            .status
    }

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("test".to_string()),
            HealthStatus::Warn("test".to_string())
        );
    }

    #[tokio::test]
    async fn test_bootable_deployment() {
        let doctor = doctor(
            vec![
                ("pkg/ybc_catalog.js", ProbeResponse::new(200, Some("application/javascript"))),
                ("pkg/ybc_catalog_bg.wasm", ProbeResponse::new(200, Some("application/wasm"))),
            ],
            true,
        );
        let checks = doctor.run_diagnostics().await;

        assert_eq!(status_of(&checks, "Mount point"), &HealthStatus::Pass);
        assert!(matches!(status_of(&checks, "Build hints"), HealthStatus::Warn(_)));
        assert_eq!(status_of(&checks, "pkg/ybc_catalog.js"), &HealthStatus::Pass);
        assert_eq!(status_of(&checks, "pkg/ybc_catalog_bg.wasm"), &HealthStatus::Pass);
        assert_eq!(status_of(&checks, "Bootable"), &HealthStatus::Pass);
        assert!(Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_mime_problems_reported() {
        let doctor = doctor(
            vec![
                ("pkg/ybc_catalog.js", ProbeResponse::new(200, Some("text/plain"))),
                ("pkg/ybc_catalog_bg.wasm", ProbeResponse::new(200, Some("application/octet-stream"))),
                ("pkg/ybc-catalog.js", ProbeResponse::new(200, Some("text/html"))),
            ],
            true,
        );
        let checks = doctor.run_diagnostics().await;

        assert!(matches!(status_of(&checks, "pkg/ybc_catalog.js"), HealthStatus::Warn(_)));
        assert!(matches!(status_of(&checks, "pkg/ybc_catalog_bg.wasm"), HealthStatus::Warn(_)));
        assert!(matches!(status_of(&checks, "pkg/ybc-catalog.js"), HealthStatus::Fail(_)));
        assert_eq!(status_of(&checks, "Bootable"), &HealthStatus::Pass);
    }

    #[tokio::test]
    async fn test_nothing_reachable_fails() {
        let doctor = doctor(Vec::new(), false);
        let checks = doctor.run_diagnostics().await;

        assert!(matches!(status_of(&checks, "Mount point"), HealthStatus::Fail(_)));
        assert!(matches!(status_of(&checks, "Bootable"), HealthStatus::Fail(_)));
        assert!(!Doctor::overall_status(&checks));
    }
}
