//! Entity contract shared by traversal, ordering and tree synthesis.

use std::fmt;
use std::hash::Hash;

use crate::domain::error::TreeError;
use crate::domain::history;

/// Bound for hierarchy level names.
pub trait Key: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> Key for T where T: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

/// What an element can do in a tree, decided once when the element is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Cannot have children.
    Leaf,
    /// May have children (directory, graph node with out-edges).
    Branch,
    /// Inserted by the engine (continuation markers, placeholders).
    Synthetic,
}

/// Position of an element: its full key path from the root.
///
/// The path is never empty; the last component is the element's own key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopoInfo<K> {
    path: Vec<K>,
}

impl<K: Clone> TopoInfo<K> {
    pub fn new(key: K, history: &[K]) -> Self {
        let mut path = Vec::with_capacity(history.len() + 1);
        path.extend_from_slice(history);
        path.push(key);
        Self { path }
    }

    /// Topo info of a child element one level below this one.
    pub fn child(&self, key: K) -> Self {
        Self::new(key, &self.path)
    }
}

impl<K> TopoInfo<K> {
    pub fn key(&self) -> &K {
        &self.path[self.path.len() - 1]
    }

    /// Ancestor keys, excluding the element itself.
    pub fn history(&self) -> &[K] {
        &self.path[..self.path.len() - 1]
    }

    /// Ancestor keys followed by the element's own key.
    pub fn hierarchy(&self) -> &[K] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }
}

impl<K: fmt::Display> TopoInfo<K> {
    pub fn path_string(&self, separator: &str) -> String {
        history::join(&self.path, separator)
    }
}

/// An element of a hierarchy as seen by the closure engine, the comparator
/// and the tree synthesizer.
pub trait Hierarchical {
    type Key: Key;

    fn topo(&self) -> &TopoInfo<Self::Key>;

    fn kind(&self) -> NodeKind;

    fn error(&self) -> Option<&TreeError>;

    fn set_error(&mut self, err: TreeError);

    /// Optional label appended to the tree graph (e.g. an element type).
    fn category(&self) -> Option<&str> {
        None
    }

    /// Elements returning false are skipped by the tree synthesizer.
    fn is_valid(&self) -> bool {
        true
    }

    fn key(&self) -> &Self::Key {
        self.topo().key()
    }

    fn history(&self) -> &[Self::Key] {
        self.topo().history()
    }

    fn hierarchy(&self) -> &[Self::Key] {
        self.topo().hierarchy()
    }

    /// Key under which children of this element appear, if it is a branch.
    fn branch_key(&self) -> Option<&Self::Key> {
        match self.kind() {
            NodeKind::Branch => Some(self.key()),
            NodeKind::Leaf | NodeKind::Synthetic => None,
        }
    }

    /// True if the closure engine may ask for children of this element.
    fn is_expandable(&self) -> bool {
        self.error().is_none() && self.kind() == NodeKind::Branch
    }
}

/// Plain hierarchy element without any payload.
///
/// Useful for hierarchies given as key paths and as building block in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K> {
    topo: TopoInfo<K>,
    kind: NodeKind,
    category: Option<String>,
    error: Option<TreeError>,
}

impl<K: Key> Entry<K> {
    pub fn new(key: K, history: &[K], kind: NodeKind) -> Self {
        Self {
            topo: TopoInfo::new(key, history),
            kind,
            category: None,
            error: None,
        }
    }

    pub fn leaf(key: K, history: &[K]) -> Self {
        Self::new(key, history, NodeKind::Leaf)
    }

    pub fn branch(key: K, history: &[K]) -> Self {
        Self::new(key, history, NodeKind::Branch)
    }

    /// Build an entry from its full path; the last component is the key.
    pub fn from_path(path: &[K], kind: NodeKind) -> Option<Self> {
        let (key, history) = path.split_last()?;
        Some(Self::new(key.clone(), history, kind))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_error(mut self, err: TreeError) -> Self {
        self.error = Some(err);
        self
    }
}

impl<K: Key> Hierarchical for Entry<K> {
    type Key = K;

    fn topo(&self) -> &TopoInfo<K> {
        &self.topo
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn error(&self) -> Option<&TreeError> {
        self.error.as_ref()
    }

    fn set_error(&mut self, err: TreeError) {
        self.error = Some(err);
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

impl<K: Key> fmt::Display for Entry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.topo.path_string("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_topo_info_when_created_then_splits_key_and_history() {
        let topo = TopoInfo::new("c".to_string(), &["a".to_string(), "b".to_string()]);
        assert_eq!(topo.key(), "c");
        assert_eq!(topo.history(), ["a", "b"]);
        assert_eq!(topo.hierarchy(), ["a", "b", "c"]);
        assert_eq!(topo.depth(), 2);
        assert_eq!(topo.child("d".to_string()).history(), ["a", "b", "c"]);
    }

    #[test]
    fn given_entry_kinds_when_asking_branch_key_then_only_branches_answer() {
        let leaf = Entry::leaf("x", &[]);
        let branch = Entry::branch("y", &[]);
        let marker = Entry::new("...", &["y"], NodeKind::Synthetic);
        assert_eq!(leaf.branch_key(), None);
        assert_eq!(branch.branch_key(), Some(&"y"));
        assert_eq!(marker.branch_key(), None);
        assert!(branch.is_expandable());
        assert!(!branch.with_error(TreeError::CycleDetected).is_expandable());
    }

    #[test]
    fn given_empty_path_when_building_entry_then_none() {
        assert!(Entry::<&str>::from_path(&[], NodeKind::Leaf).is_none());
        let e = Entry::from_path(&["a", "b"], NodeKind::Leaf).unwrap();
        assert_eq!(e.to_string(), "a/b");
    }
}
