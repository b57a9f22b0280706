//! Core data types shared across the bootstrap pipeline
//!
//! A candidate is nothing more than a location string; its position in the
//! candidate list is what gives it meaning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single resolvable module location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    /// Create a candidate from a location string
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Location as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Candidate {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<String> for Candidate {
    fn from(location: String) -> Self {
        Self(location)
    }
}

/// Ordered candidate sequence: discovered hints first, then fixed defaults.
///
/// Duplicates are kept; a location hinted by the document and also present in
/// the defaults is simply tried twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
    hinted: usize,
}

impl CandidateList {
    /// Concatenate discovered hints with the default sequence
    pub fn build(hints: Vec<Candidate>, defaults: &[String]) -> Self {
        let hinted = hints.len();
        let mut candidates = hints;
        candidates.extend(defaults.iter().map(|d| Candidate::new(d.as_str())));
        Self { candidates, hinted }
    }

    /// Number of entries that came from document hints
    pub fn hinted_count(&self) -> usize {
        self.hinted
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    /// Whether the entry at `index` was discovered from the document
    pub fn is_hinted(&self, index: usize) -> bool {
        index < self.hinted
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
