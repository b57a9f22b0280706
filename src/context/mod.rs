//! Injected environment for the bootstrap pipeline
//!
//! The page, the global namespace, the network and the module host are all
//! reached through these traits, so the same pipeline runs against a fetched
//! deployment or an in-memory fake.

use crate::errors::Result;
use crate::loader::ModuleHost;
use crate::probe::ResourceClient;
use crate::render::MountPoint;
use std::sync::Arc;

/// A `<link>` element as declared in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: Option<String>,
    pub href: Option<String>,
}

impl LinkTag {
    pub fn new(rel: &str, href: &str) -> Self {
        Self {
            rel: Some(rel.to_string()),
            href: Some(href.to_string()),
        }
    }
}

/// Read-only view of the current document
pub trait DocumentContext: Send + Sync {
    /// Absolute location of the page, used to resolve relative hrefs
    fn location(&self) -> &str;

    /// All `<link>` elements in document order
    fn links(&self) -> Vec<LinkTag>;

    /// `content` of the first `<meta name=...>` matching `name`
    fn meta_content(&self, name: &str) -> Option<String>;

    /// Element with the given id, if the document has one
    fn mount_point(&self, id: &str) -> Option<MountPoint>;
}

/// An optional third-party library living in the global namespace
pub trait EnhancementLibrary: Send + Sync {
    /// Whether `entry_point` exists and is callable
    fn has_entry_point(&self, entry_point: &str) -> bool;

    /// Call `entry_point` with no arguments
    fn invoke(&self, entry_point: &str) -> Result<()>;
}

/// Read-only presence checks on the global namespace
pub trait GlobalEnvironment: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<dyn EnhancementLibrary>>;
}

/// Global namespace with nothing in it
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGlobals;

impl GlobalEnvironment for NoGlobals {
    fn lookup(&self, _name: &str) -> Option<Arc<dyn EnhancementLibrary>> {
        None
    }
}

/// Everything a bootstrap run touches outside itself
#[derive(Clone)]
pub struct Environment {
    pub document: Arc<dyn DocumentContext>,
    pub globals: Arc<dyn GlobalEnvironment>,
    pub client: Arc<dyn ResourceClient>,
    pub host: Arc<dyn ModuleHost>,
}

impl Environment {
    pub fn new(
        document: Arc<dyn DocumentContext>,
        globals: Arc<dyn GlobalEnvironment>,
        client: Arc<dyn ResourceClient>,
        host: Arc<dyn ModuleHost>,
    ) -> Self {
        Self {
            document,
            globals,
            client,
            host,
        }
    }
}
