//! Topological ordering of hierarchy elements.
//!
//! A hierarchy is a set of elements where each element is either a top level
//! element or has its parent in the same set. Such a set can be sorted so that
//! every element comes after its parent and before all of its children.
//!
//! The order among siblings is taken from a reference list: typically the
//! closure output itself, or the same list after sorting it by element
//! attributes. [`HierarchyComparator`] indexes the reference list by full key
//! path and compares two elements by the rank of the first path prefix in
//! which they differ.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{instrument, warn};

use crate::domain::element::{Hierarchical, Key};
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::history;

/// Comparator enforcing "ancestor before descendant" and reference order for
/// siblings.
#[derive(Debug, Clone)]
pub struct HierarchyComparator<K> {
    index: HashMap<Vec<K>, usize>,
}

impl<K: Key> HierarchyComparator<K> {
    /// Index the full paths of `reference`. A path listed twice keeps the rank
    /// of its last occurrence.
    #[instrument(level = "debug", skip_all, fields(len = reference.len()))]
    pub fn new<E: Hierarchical<Key = K>>(reference: &[E]) -> Self {
        Self::from_paths(reference.iter().map(|e| e.hierarchy().to_vec()))
    }

    pub fn from_paths<I: IntoIterator<Item = Vec<K>>>(paths: I) -> Self {
        let mut index = HashMap::new();
        for (rank, path) in paths.into_iter().enumerate() {
            index.insert(path, rank);
        }
        Self { index }
    }

    /// Position of `path` in the reference list.
    pub fn rank(&self, path: &[K]) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Compare two key paths; fails if a prefix needed for the decision is
    /// not part of the reference list.
    pub fn try_compare_paths(&self, a: &[K], b: &[K]) -> TreeResult<Ordering> {
        match first_divergence(a, b) {
            Some(level) => {
                let ra = self.required_rank(&a[..=level])?;
                let rb = self.required_rank(&b[..=level])?;
                Ok(ra.cmp(&rb))
            }
            None => Ok(a.len().cmp(&b.len())),
        }
    }

    pub fn try_compare<E: Hierarchical<Key = K>>(&self, a: &E, b: &E) -> TreeResult<Ordering> {
        self.try_compare_paths(a.hierarchy(), b.hierarchy())
    }

    /// Total comparison usable for sorting. Prefixes missing from the
    /// reference list rank first.
    pub fn compare_paths(&self, a: &[K], b: &[K]) -> Ordering {
        match self.try_compare_paths(a, b) {
            Ok(order) => order,
            Err(err) => {
                warn!(%err, "incomplete reference list");
                match first_divergence(a, b) {
                    Some(level) => {
                        let ra = self.rank(&a[..=level]).unwrap_or(0);
                        let rb = self.rank(&b[..=level]).unwrap_or(0);
                        ra.cmp(&rb)
                    }
                    None => a.len().cmp(&b.len()),
                }
            }
        }
    }

    pub fn compare<E: Hierarchical<Key = K>>(&self, a: &E, b: &E) -> Ordering {
        self.compare_paths(a.hierarchy(), b.hierarchy())
    }

    /// Stable in-place sort of `elements`.
    pub fn sort<E: Hierarchical<Key = K>>(&self, elements: &mut [E]) {
        elements.sort_by(|a, b| self.compare(a, b));
    }

    fn required_rank(&self, prefix: &[K]) -> TreeResult<usize> {
        self.rank(prefix).ok_or_else(|| TreeError::ComparatorInput {
            path: history::join(prefix, "/"),
        })
    }
}

/// Sort `elements` topologically, using their current order as reference.
pub fn sort_hierarchy<E: Hierarchical>(elements: &mut [E]) {
    let cmp = HierarchyComparator::new(elements);
    cmp.sort(elements);
}

fn first_divergence<K: PartialEq>(a: &[K], b: &[K]) -> Option<usize> {
    a.iter().zip(b).position(|(x, y)| x != y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::Entry;

    fn path(p: &'static str) -> Vec<&'static str> {
        p.split('/').collect()
    }

    #[test]
    fn given_missing_prefix_when_try_compare_then_comparator_input_error() {
        let cmp = HierarchyComparator::from_paths(vec![path("a"), path("a/b")]);
        let err = cmp.try_compare_paths(&path("a/b"), &path("c/d")).unwrap_err();
        assert_eq!(
            err,
            TreeError::ComparatorInput {
                path: "c".to_string()
            }
        );
        // the total variant still answers
        assert_eq!(cmp.compare_paths(&path("a/b"), &path("c/d")), Ordering::Equal);
    }

    #[test]
    fn given_prefix_when_compared_then_ancestor_first() {
        let cmp = HierarchyComparator::from_paths(vec![path("a/b"), path("a")]);
        assert_eq!(cmp.compare_paths(&path("a"), &path("a/b")), Ordering::Less);
        assert_eq!(cmp.compare_paths(&path("a/b"), &path("a")), Ordering::Greater);
    }

    #[test]
    fn given_duplicate_path_when_indexing_then_last_rank_wins() {
        let elements = vec![
            Entry::leaf("x", &[]),
            Entry::leaf("y", &[]),
            Entry::leaf("x", &[]),
        ];
        let cmp = HierarchyComparator::new(&elements);
        assert_eq!(cmp.rank(&["x"]), Some(2));
        assert_eq!(cmp.len(), 2);
    }
}
