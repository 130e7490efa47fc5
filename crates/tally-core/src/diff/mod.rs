//! Added/removed representation of an edit's effect.
//!
//! Scalar fields carry their new value directly. Collection fields carry a
//! [`SliceDiff`]: the values to add and the values to remove, resolved
//! against the target's state when the edit was proposed. Applying a diff
//! computes `current - removed + added`, so independent edits touching
//! different members of the same collection both survive.

mod details;
mod input;

pub use details::{EditDetails, PerformerDiff, SceneDiff, StudioDiff, TagDiff};
pub use input::{EditInput, PerformerInput, SceneInput, StudioInput, TagInput};

use serde::{Deserialize, Serialize};

/// Added and removed members of one collection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceDiff<T> {
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<T>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<T>,
}

impl<T> Default for SliceDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> SliceDiff<T> {
    /// Diff of the desired collection `new` against `current`.
    ///
    /// `added` holds the distinct members of `new` missing from `current`;
    /// `removed` holds the distinct members of `current` missing from `new`.
    #[must_use]
    pub fn compare(new: &[T], current: &[T]) -> Self {
        Self {
            added: distinct(new.iter().filter(|v| !current.contains(v))),
            removed: distinct(current.iter().filter(|v| !new.contains(v))),
        }
    }

    /// Diff that builds a collection from nothing.
    #[must_use]
    pub fn created(values: &[T]) -> Self {
        Self {
            added: distinct(values.iter()),
            removed: Vec::new(),
        }
    }

    /// Diff for an optional input: `None` means the field is untouched.
    #[must_use]
    pub fn from_input(input: Option<&[T]>, current: &[T]) -> Self {
        input.map_or_else(Self::default, |new| Self::compare(new, current))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// `current - removed + added`, keeping the order of `current` and
    /// appending new members. Duplicates are never introduced.
    #[must_use]
    pub fn apply_to(&self, current: &[T]) -> Vec<T> {
        let mut out: Vec<T> = Vec::with_capacity(current.len() + self.added.len());
        for value in current {
            if !self.removed.contains(value) && !out.contains(value) {
                out.push(value.clone());
            }
        }
        for value in &self.added {
            if !out.contains(value) {
                out.push(value.clone());
            }
        }
        out
    }
}

fn distinct<'a, T: Clone + PartialEq + 'a>(values: impl Iterator<Item = &'a T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

/// Returns `new` when it differs from `current`.
pub(crate) fn changed<T: PartialEq + Clone>(new: Option<&T>, current: Option<&T>) -> Option<T> {
    match (new, current) {
        (Some(new), Some(current)) if new == current => None,
        (new, _) => new.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{SliceDiff, changed};

    #[test]
    fn compare_reports_added_and_removed() {
        let diff = SliceDiff::compare(&["b", "c", "c"], &["a", "b"]);
        assert_eq!(diff.added, vec!["c"]);
        assert_eq!(diff.removed, vec!["a"]);
    }

    #[test]
    fn empty_input_clears_collection() {
        let diff = SliceDiff::from_input(Some(&[][..]), &["a", "b"]);
        assert_eq!(diff.removed, vec!["a", "b"]);
        assert_eq!(diff.apply_to(&["a", "b"]), Vec::<&str>::new());
    }

    #[test]
    fn absent_input_changes_nothing() {
        let diff = SliceDiff::<&str>::from_input(None, &["a"]);
        assert!(diff.is_empty());
    }

    #[test]
    fn apply_keeps_concurrent_additions() {
        // Proposed against ["a"], but "x" was added by another edit since.
        let diff = SliceDiff::compare(&["a", "b"], &["a"]);
        assert_eq!(diff.apply_to(&["a", "x"]), vec!["a", "x", "b"]);
    }

    #[test]
    fn apply_does_not_duplicate_existing_members() {
        let diff = SliceDiff {
            added: vec!["a"],
            removed: vec![],
        };
        assert_eq!(diff.apply_to(&["a"]), vec!["a"]);
    }

    #[test]
    fn changed_drops_equal_scalars() {
        assert_eq!(changed(Some(&"x"), Some(&"x")), None);
        assert_eq!(changed(Some(&"y"), Some(&"x")), Some("y"));
        assert_eq!(changed(Some(&"y"), None), Some("y"));
        assert_eq!(changed::<&str>(None, Some(&"x")), None);
    }
}
