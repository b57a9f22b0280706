//! Candidate discovery from document metadata
//!
//! Preload hints win over the meta hint; the meta hint is only consulted when
//! the document declares no usable preload. Defaults are appended by the caller
//! regardless of what was discovered.

use crate::context::{DocumentContext, LinkTag};
use crate::types::{Candidate, CandidateList};
use reqwest::Url;

/// Relationship that marks a bundler-injected module preload
pub const PRELOAD_REL: &str = "modulepreload";

/// Default name of the meta tag carrying a package hint
pub const DEFAULT_META_HINT: &str = "wasm-pkg";

/// Conventional build output locations, tried after any hints
pub const DEFAULT_CANDIDATES: [&str; 3] = [
    "pkg/ybc_catalog.js",
    "pkg/ybc-catalog.js",
    "pkg/ybc_catalog_bg.js",
];

/// Reads hinted module locations out of a document
#[derive(Debug, Clone)]
pub struct CandidateSource {
    meta_hint_name: String,
    script_suffix: String,
}

impl Default for CandidateSource {
    fn default() -> Self {
        Self::new(DEFAULT_META_HINT, ".js")
    }
}

impl CandidateSource {
    pub fn new(meta_hint_name: &str, script_suffix: &str) -> Self {
        Self {
            meta_hint_name: meta_hint_name.to_string(),
            script_suffix: script_suffix.to_string(),
        }
    }

    /// Hinted locations, highest priority first
    pub fn discover_hints(&self, document: &dyn DocumentContext) -> Vec<Candidate> {
        let preloads = self.preload_hints(document);
        if !preloads.is_empty() {
            return preloads;
        }

        document
            .meta_content(&self.meta_hint_name)
            .map(|content| content.trim().to_string())
            .filter(|hint| !hint.is_empty())
            .map(|hint| vec![Candidate::new(hint)])
            .unwrap_or_default()
    }

    /// Hints followed by `defaults`
    pub fn candidate_list(&self, document: &dyn DocumentContext, defaults: &[String]) -> CandidateList {
        CandidateList::build(self.discover_hints(document), defaults)
    }

    fn preload_hints(&self, document: &dyn DocumentContext) -> Vec<Candidate> {
        let base = Url::parse(document.location()).ok();

        document
            .links()
            .iter()
            .filter_map(|link| self.preload_href(link))
            .map(|href| Candidate::new(resolve_path(base.as_ref(), href)))
            .collect()
    }

    fn preload_href<'a>(&self, link: &'a LinkTag) -> Option<&'a str> {
        if link.rel.as_deref() != Some(PRELOAD_REL) {
            return None;
        }
        link.href
            .as_deref()
            .filter(|href| href.ends_with(self.script_suffix.as_str()))
    }
}

/// Path of `href` resolved against the page, or `href` itself when that fails
fn resolve_path(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|url| url.path().to_string())
        .unwrap_or_else(|| href.to_string())
}
