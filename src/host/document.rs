//! Document context over fetched page HTML
//!
//! Only start tags matter here: `<link>` and `<meta>` attributes, and which
//! elements carry an id. Comments and script/template bodies are stripped
//! before scanning, since markup inside them is not part of the DOM.

use crate::context::{DocumentContext, LinkTag};
use crate::render::{Element, MountPoint};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));
static RAW_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<template\b[^>]*>.*?</template\s*>")
        .expect("valid raw text regex")
});
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<([a-z][a-z0-9-]*)\b([^>]*)>").expect("valid tag regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([a-z_:][a-z0-9_:.-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("valid attribute regex")
});

/// Attributes of one start tag, names lowercased
#[derive(Debug, Clone, Default)]
struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn parse(raw: &str) -> Self {
        let attrs = ATTR_RE
            .captures_iter(raw)
            .map(|caps| {
                let name = caps[1].to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str().replace("&amp;", "&"))
                    .unwrap_or_default();
                (name, value)
            })
            .collect();
        Self(attrs)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A page as served, scanned once at construction
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    location: String,
    links: Vec<LinkTag>,
    metas: Vec<(String, String)>,
    mounts: HashMap<String, MountPoint>,
}

impl HtmlDocument {
    pub fn parse(location: &str, html: &str) -> Self {
        let uncommented = COMMENT_RE.replace_all(html, "");
        let stripped = RAW_TEXT_RE.replace_all(&uncommented, "");

        let mut links = Vec::new();
        let mut metas = Vec::new();
        let mut mounts = HashMap::new();

        for caps in TAG_RE.captures_iter(&stripped) {
            let tag = caps[1].to_ascii_lowercase();
            let attrs = Attributes::parse(&caps[2]);

            match tag.as_str() {
                "link" => links.push(LinkTag {
                    rel: attrs.get("rel").map(str::to_string),
                    href: attrs.get("href").map(str::to_string),
                }),
                "meta" => {
                    if let Some(name) = attrs.get("name") {
                        metas.push((
                            name.to_string(),
                            attrs.get("content").unwrap_or_default().to_string(),
                        ));
                    }
                }
                _ => {}
            }

            // getElementById semantics: first element with the id wins
            if let Some(id) = attrs.get("id") {
                mounts
                    .entry(id.to_string())
                    .or_insert_with(|| MountPoint::new(Element::new(&tag).with_id(id)));
            }
        }

        Self {
            location: location.to_string(),
            links,
            metas,
            mounts,
        }
    }
}

impl DocumentContext for HtmlDocument {
    fn location(&self) -> &str {
        &self.location
    }

    fn links(&self) -> Vec<LinkTag> {
        self.links.clone()
    }

    fn meta_content(&self, name: &str) -> Option<String> {
        self.metas
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.clone())
    }

    fn mount_point(&self, id: &str) -> Option<MountPoint> {
        self.mounts.get(id).cloned()
    }
}
