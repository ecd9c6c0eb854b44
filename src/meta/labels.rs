//! Search label sets attached to postings

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of search titles or locations a posting was discovered under
///
/// Only ever grows; inserting an existing value is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning true if it was not already present
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.0.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_superset(&self, other: &LabelSet) -> bool {
        self.0.is_superset(&other.0)
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for LabelSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Labels that a rediscovered posting is missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeUpdate {
    pub add_title: Option<String>,
    pub add_location: Option<String>,
}

impl MergeUpdate {
    /// Only the labels not yet on the posting
    pub fn for_labels(titles: &LabelSet, locations: &LabelSet, title: &str, location: &str) -> Self {
        Self {
            add_title: (!titles.contains(title)).then(|| title.to_string()),
            add_location: (!locations.contains(location)).then(|| location.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add_title.is_none() && self.add_location.is_none()
    }
}
