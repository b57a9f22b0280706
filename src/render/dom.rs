//! Minimal element tree for the mount point
//!
//! Only what the fallback UI needs: tags, an id, classes, text and nested
//! children, serializable back to HTML.

use std::sync::{Arc, Mutex, MutexGuard};

/// A node in the mount point's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with tag, optional id, classes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set classes from a space separated list
    pub fn with_class(mut self, class_name: &str) -> Self {
        self.classes = class_name.split_whitespace().map(str::to_string).collect();
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes.iter().any(|c| c == class_name)
    }

    /// Direct element children, skipping text
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Depth-first search for a descendant (or self) matching `predicate`
    pub fn find(&self, predicate: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        if predicate(self) {
            return Some(self);
        }
        self.element_children().find_map(|child| child.find(predicate))
    }

    /// Concatenated text of this element and all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(id) = &self.id {
            out.push_str(&format!(" id=\"{}\"", escape(id)));
        }
        if !self.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape(&self.classes.join(" "))));
        }
        out.push('>');
        if is_void(&self.tag) {
            return;
        }
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&escape(t)),
                Node::Element(e) => e.write_html(out),
            }
        }
        out.push_str(&format!("</{}>", self.tag));
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "br" | "hr" | "img" | "input" | "meta" | "link")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Shared handle to the container the bootstrap owns.
///
/// Clones refer to the same element, so the document context and the renderer
/// observe the same content.
#[derive(Debug, Clone)]
pub struct MountPoint {
    root: Arc<Mutex<Element>>,
}

impl MountPoint {
    pub fn new(root: Element) -> Self {
        Self {
            root: Arc::new(Mutex::new(root)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Element> {
        // A poisoned lock still holds a usable tree
        self.root.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove all existing content
    pub fn clear(&self) {
        self.lock().children.clear();
    }

    pub fn append(&self, child: Element) {
        self.lock().append(child);
    }

    /// Snapshot of the current content
    pub fn snapshot(&self) -> Element {
        self.lock().clone()
    }

    pub fn child_count(&self) -> usize {
        self.lock().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.child_count() == 0
    }

    pub fn to_html(&self) -> String {
        self.lock().to_html()
    }
}
