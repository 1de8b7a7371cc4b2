//! Deduplicated, ordered set of detected fruit names.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Separator used when rendering a set as a single string.
pub const NAME_SEPARATOR: &str = ", ";

/// Names detected in one request.
///
/// Iteration is in full lexicographic order, so two equal sets always render
/// the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DetectedFruitSet {
    names: BTreeSet<String>,
}

impl DetectedFruitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name. Returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// All names joined with `", "`.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(NAME_SEPARATOR)
    }

    /// Response payload: the joined names, or `None` when nothing was found.
    pub fn data(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.joined())
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for DetectedFruitSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
