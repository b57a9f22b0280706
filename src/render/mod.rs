//! Diagnostic fallback UI
//!
//! Written into the mount point only after every candidate was rejected.
//! Afterwards each optional enhancement library found in the global namespace
//! gets its `attach` call, each guarded on its own.

pub mod dom;

pub use dom::{Element, MountPoint, Node};

use crate::context::GlobalEnvironment;
use crate::errors::BootError;
use crate::guard::attempt;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Optional libraries activated after the fallback renders
pub const DEFAULT_ENHANCEMENTS: [&str; 3] = ["bulmaCalendar", "bulmaAccordion", "bulmaTagsInput"];

/// Entry point called on each enhancement library
pub const DEFAULT_ENTRY_POINT: &str = "attach";

/// What happened to one enhancement library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Not in the global namespace, or no callable entry point
    Absent(String),
    Activated(String),
    Failed(String),
}

impl Activation {
    pub fn library(&self) -> &str {
        match self {
            Activation::Absent(name) | Activation::Activated(name) | Activation::Failed(name) => name,
        }
    }
}

/// Builds the diagnostic tree and activates enhancements
#[derive(Debug, Clone)]
pub struct FallbackRenderer {
    libraries: Vec<String>,
    entry_point: String,
    telemetry: Option<TelemetryCollector>,
}

impl Default for FallbackRenderer {
    fn default() -> Self {
        Self::new(
            DEFAULT_ENHANCEMENTS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_ENTRY_POINT,
        )
    }
}

impl FallbackRenderer {
    pub fn new(libraries: Vec<String>, entry_point: &str) -> Self {
        Self {
            libraries,
            entry_point: entry_point.to_string(),
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Replace the mount point's content with the diagnostic section, then
    /// activate whatever enhancement libraries are present.
    pub async fn render(&self, mount: &MountPoint, globals: &dyn GlobalEnvironment) -> Vec<Activation> {
        mount.clear();
        mount.append(diagnostic_section());
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::FallbackRendered {
                timestamp: Instant::now(),
            });
        }

        let mut activations = Vec::with_capacity(self.libraries.len());
        for library in &self.libraries {
            activations.push(self.activate(library, globals).await);
        }
        activations
    }

    async fn activate(&self, library: &str, globals: &dyn GlobalEnvironment) -> Activation {
        let handle = match globals.lookup(library) {
            Some(handle) if handle.has_entry_point(&self.entry_point) => handle,
            _ => return Activation::Absent(library.to_string()),
        };

        let entry_point = self.entry_point.as_str();
        let result = attempt(library, async move {
            handle.invoke(entry_point).map_err(|e| BootError::Enhancement {
                library: library.to_string(),
                reason: e.to_string(),
            })
        })
        .await;

        if let Some(telemetry) = &self.telemetry {
            telemetry.record(TelemetryEvent::EnhancementActivated {
                library: library.to_string(),
                success: result.is_ok(),
                timestamp: Instant::now(),
            });
        }

        match result {
            Ok(()) => Activation::Activated(library.to_string()),
            Err(()) => Activation::Failed(library.to_string()),
        }
    }
}

/// The fixed diagnostic structure attached to the mount point
pub fn diagnostic_section() -> Element {
    let message_body = Element::new("div")
        .with_class("message-body")
        .with_text("WASM could not be loaded. Check console for details.")
        .with_child(Element::new("br"))
        .with_text("Build with: ")
        .with_child(Element::new("code").with_text("wasm-pack build --target web"))
        .with_text(" (or use ")
        .with_child(Element::new("code").with_text("trunk"))
        .with_text(").")
        .with_child(Element::new("br"))
        .with_text("Ensure ")
        .with_child(Element::new("code").with_text("pkg/"))
        .with_text(" files are served and that your server returns correct MIME types: ")
        .with_child(Element::new("code").with_text("application/javascript"))
        .with_text(" for .js and ")
        .with_child(Element::new("code").with_text("application/wasm"))
        .with_text(" for .wasm.");

    let message = Element::new("article")
        .with_class("message is-danger")
        .with_child(
            Element::new("div")
                .with_class("message-header")
                .with_child(Element::new("p").with_text("WASM load error")),
        )
        .with_child(message_body);

    let container = Element::new("div")
        .with_class("container")
        .with_child(
            Element::new("h1")
                .with_class("title")
                .with_text("YBC Component Catalog (JS fallback)"),
        )
        .with_child(
            Element::new("p")
                .with_class("subtitle")
                .with_text("WASM failed to load — showing fallback UI and diagnostics below."),
        )
        .with_child(Element::new("div").with_id("catalog").with_child(message));

    Element::new("section").with_class("section").with_child(container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EnhancementLibrary, NoGlobals};
    use crate::errors::Result;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Library {
        calls: AtomicUsize,
        fails: bool,
    }

    impl EnhancementLibrary for Library {
        fn has_entry_point(&self, entry_point: &str) -> bool {
            entry_point == "attach"
        }

        fn invoke(&self, _entry_point: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                Err(BootError::Generic("attach threw".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct Globals(HashMap<String, Arc<Library>>);

    impl GlobalEnvironment for Globals {
        fn lookup(&self, name: &str) -> Option<Arc<dyn EnhancementLibrary>> {
            self.0
                .get(name)
                .map(|lib| lib.clone() as Arc<dyn EnhancementLibrary>)
        }
    }

    fn library(fails: bool) -> Arc<Library> {
        Arc::new(Library {
            calls: AtomicUsize::new(0),
            fails,
        })
    }

    #[test]
    fn test_diagnostic_section_structure() {
        let section = diagnostic_section();
        assert_eq!(section.tag, "section");
        assert!(section.has_class("section"));

        let panel = section
            .find(&|e| e.has_class("is-danger"))
            .expect("error panel");
        assert!(panel.has_class("message"));

        let text = section.text_content();
        assert!(text.contains("wasm-pack build --target web"));
        assert!(text.contains("application/javascript"));
        assert!(text.contains("application/wasm"));
        assert!(section.find(&|e| e.id.as_deref() == Some("catalog")).is_some());
    }

    #[test]
    fn test_diagnostic_section_headings() {
        let section = diagnostic_section();
        let title = section.find(&|e| e.has_class("title")).expect("title");
        assert_eq!(title.text_content(), "YBC Component Catalog (JS fallback)");
        let subtitle = section.find(&|e| e.has_class("subtitle")).expect("subtitle");
        assert_eq!(
            subtitle.text_content(),
            "WASM failed to load — showing fallback UI and diagnostics below."
        );
    }

    #[tokio::test]
    async fn test_render_replaces_existing_content() {
        let mount = MountPoint::new(
            Element::new("div")
                .with_id("root")
                .with_child(Element::new("p").with_text("Loading..."))
                .with_text("stale"),
        );

        FallbackRenderer::default().render(&mount, &NoGlobals).await;

        let root = mount.snapshot();
        assert_eq!(root.children.len(), 1);
        assert!(!root.text_content().contains("Loading..."));
        assert_eq!(root.element_children().next().map(|e| e.tag.as_str()), Some("section"));
    }

    #[tokio::test]
    async fn test_absent_library_does_not_block_others() {
        let calendar = library(false);
        let tags = library(false);
        let mut map = HashMap::new();
        map.insert("bulmaCalendar".to_string(), calendar.clone());
        map.insert("bulmaTagsInput".to_string(), tags.clone());

        let mount = MountPoint::new(Element::new("div"));
        let activations = FallbackRenderer::default().render(&mount, &Globals(map)).await;

        assert_eq!(
            activations,
            vec![
                Activation::Activated("bulmaCalendar".to_string()),
                Activation::Absent("bulmaAccordion".to_string()),
                Activation::Activated("bulmaTagsInput".to_string()),
            ]
        );
        assert_eq!(calendar.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tags.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_library_isolated() {
        let calendar = library(true);
        let accordion = library(false);
        let mut map = HashMap::new();
        map.insert("bulmaCalendar".to_string(), calendar);
        map.insert("bulmaAccordion".to_string(), accordion.clone());

        let telemetry = TelemetryCollector::new();
        let mount = MountPoint::new(Element::new("div"));
        let activations = FallbackRenderer::default()
            .with_telemetry(telemetry.clone())
            .render(&mount, &Globals(map))
            .await;

        assert_eq!(activations[0], Activation::Failed("bulmaCalendar".to_string()));
        assert_eq!(activations[1], Activation::Activated("bulmaAccordion".to_string()));
        assert_eq!(accordion.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mount.child_count(), 1);
        assert_eq!(telemetry.get_stats().enhancement_failures, 1);
    }
}
