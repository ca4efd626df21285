//! Tag-based script selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Three-part tag predicate.
///
/// The parts combine with OR, not AND: a script is selected when any
/// non-empty part matches it. An entirely empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    /// Selects scripts carrying every one of these tags.
    pub tags: BTreeSet<String>,
    /// Selects scripts carrying none of these tags.
    pub not_tags: BTreeSet<String>,
    /// Selects scripts carrying at least one of these tags.
    pub any_tags: BTreeSet<String>,
}

impl TagFilter {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.not_tags.is_empty() && self.any_tags.is_empty()
    }

    pub fn matches(&self, script_tags: &BTreeSet<String>) -> bool {
        if self.is_empty() {
            return true;
        }

        let all_of = !self.tags.is_empty() && self.tags.is_subset(script_tags);
        let none_of = !self.not_tags.is_empty() && self.not_tags.is_disjoint(script_tags);
        let any_of = !self.any_tags.is_empty() && !self.any_tags.is_disjoint(script_tags);

        all_of || none_of || any_of
    }
}
