//! ASCII tree synthesis for topologically sorted element lists.
//!
//! [`TreeSynthesizer::synthesize`] maps a list of elements, sorted with
//! [`HierarchyComparator`](crate::domain::topo::HierarchyComparator), into
//! rows carrying a connector graph:
//!
//! ```text
//! └─ ⊗ a
//!    ├─ d          <- synthesized, no element for a/d
//!    │  ├─ j
//!    │  └─ k
//!    └─ e
//! ```
//!
//! Levels without an element of their own get a synthesized row, so a list
//! of leaves alone already renders as a complete tree.

use std::fmt;

use tracing::{instrument, trace};

use crate::domain::element::Hierarchical;
use crate::domain::history::{has_prefix, History};

pub const VERTICAL: &str = "│  ";
pub const HORIZONTAL: &str = "─";
pub const CORNER: &str = "└─";
pub const FORK: &str = "├─";
pub const SPACE: &str = "   ";
pub const NODE_SYMBOL: &str = "⊗";

/// Placeholder for a hierarchy level without an explicit element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticNode<K> {
    pub key: K,
    pub history: History<K>,
    /// Index (in the synthesizer input) of the element that required this node.
    pub caused_by: usize,
}

impl<K: fmt::Display> fmt::Display for SyntheticNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Payload of a [`TreeRow`].
#[derive(Debug)]
pub enum RowObject<'a, E: Hierarchical> {
    /// Element from the input list.
    Element(&'a E),
    /// Element produced by the node creator for a missing level.
    Created(E),
    /// Bare placeholder for a missing level.
    Node(SyntheticNode<E::Key>),
}

/// One output line: connector graph plus the object shown on it.
#[derive(Debug)]
pub struct TreeRow<'a, E: Hierarchical> {
    pub graph: String,
    pub object: RowObject<'a, E>,
}

impl<'a, E: Hierarchical> TreeRow<'a, E> {
    /// The element shown on this row, unless it is a bare placeholder.
    pub fn element(&self) -> Option<&E> {
        match &self.object {
            RowObject::Element(e) => Some(e),
            RowObject::Created(e) => Some(e),
            RowObject::Node(_) => None,
        }
    }

    pub fn key(&self) -> &E::Key {
        match &self.object {
            RowObject::Element(e) => e.key(),
            RowObject::Created(e) => e.key(),
            RowObject::Node(n) => &n.key,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        !matches!(self.object, RowObject::Element(_))
    }
}

impl<'a, E> fmt::Display for TreeRow<'a, E>
where
    E: Hierarchical,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.graph, self.key())
    }
}

type NodeCreator<'c, E> = dyn Fn(&[<E as Hierarchical>::Key], &<E as Hierarchical>::Key) -> Option<E> + 'c;

/// Builds tree rows from a sorted element list.
pub struct TreeSynthesizer<'c, E: Hierarchical> {
    symbol: String,
    creator: Option<Box<NodeCreator<'c, E>>>,
}

impl<'c, E: Hierarchical> Default for TreeSynthesizer<'c, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'c, E: Hierarchical> TreeSynthesizer<'c, E> {
    pub fn new() -> Self {
        Self::with_symbol(NODE_SYMBOL)
    }

    /// Symbol tagging branch rows followed by their children. An empty symbol
    /// disables tagging.
    pub fn with_symbol(symbol: &str) -> Self {
        let symbol = if symbol.is_empty() || symbol.starts_with(' ') {
            symbol.to_string()
        } else {
            format!(" {symbol}")
        };
        Self {
            symbol,
            creator: None,
        }
    }

    /// Callback creating elements for missing levels from (history, key).
    /// Returning `None` falls back to a [`SyntheticNode`].
    pub fn with_creator<F>(mut self, creator: F) -> Self
    where
        F: Fn(&[E::Key], &E::Key) -> Option<E> + 'c,
    {
        self.creator = Some(Box::new(creator));
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[instrument(level = "debug", skip_all, fields(len = elements.len()))]
    pub fn synthesize<'a>(&self, elements: &'a [E]) -> Vec<TreeRow<'a, E>> {
        let mut rows = Vec::with_capacity(elements.len());
        self.level(elements, "", &[], 0, &mut rows);
        trace!("synthesized {} rows", rows.len());
        rows
    }

    /// Emit rows for the level below `prefix`, starting at `start`, until an
    /// element leaves the prefix.
    fn level<'a>(
        &self,
        objs: &'a [E],
        header: &str,
        prefix: &[E::Key],
        start: usize,
        rows: &mut Vec<TreeRow<'a, E>>,
    ) {
        let lvl = prefix.len();
        let mut node: Option<&'a E::Key> = None;
        let mut i = start;
        while i < objs.len() {
            let h = objs[i].history();
            if !has_prefix(h, prefix) {
                return;
            }
            let key = objs[i].branch_key();

            // find the next sibling at this level, skipping the subtree of
            // the current entry
            let mut ftag = CORNER;
            let mut stag = SPACE;
            let mut next = i + 1;
            while next < objs.len() {
                let s = objs[next].history();
                if has_prefix(s, prefix) {
                    if s.len() > lvl && h.len() > lvl && h[lvl] == s[lvl] {
                        next += 1;
                        continue;
                    }
                    if key.is_some_and(|k| s.len() > lvl && *k == s[lvl]) {
                        next += 1;
                        continue;
                    }
                    ftag = FORK;
                    stag = VERTICAL;
                }
                break;
            }

            if h.len() == lvl {
                node = key;
                let mut sym = String::new();
                if let (Some(n), Some(following)) = (node, objs.get(i + 1)) {
                    let sub = following.history();
                    if sub.len() > h.len() && has_prefix(sub, h) && sub[h.len()] == *n {
                        sym.push_str(&self.symbol);
                    }
                }
                if let Some(category) = objs[i].category().filter(|c| !c.is_empty()) {
                    sym.push(' ');
                    sym.push_str(category);
                }
                if objs[i].is_valid() {
                    rows.push(TreeRow {
                        graph: format!("{header}{ftag}{sym}"),
                        object: RowObject::Element(&objs[i]),
                    });
                }
                i += 1;
            } else {
                let child = &h[lvl];
                if node != Some(child) {
                    // no element for this level has been emitted: synthesize one
                    let created = self.creator.as_ref().and_then(|c| c(prefix, child));
                    let object = match created {
                        Some(e) => RowObject::Created(e),
                        None => RowObject::Node(SyntheticNode {
                            key: child.clone(),
                            history: History::from(prefix),
                            caused_by: i,
                        }),
                    };
                    rows.push(TreeRow {
                        graph: format!("{header}{ftag}"),
                        object,
                    });
                }
                self.level(objs, &format!("{header}{stag}"), &h[..=lvl], i, rows);
                i = next;
                node = None;
            }
        }
    }
}
