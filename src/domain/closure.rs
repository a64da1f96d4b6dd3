//! Closure engine: explores everything reachable from a root element.
//!
//! The engine produces a flat, pre-ordered list of elements (each element
//! before its descendants). Every element carries its full key path, so the
//! list can later be ordered by [`HierarchyComparator`](crate::domain::topo)
//! and rendered by [`TreeSynthesizer`](crate::domain::tree).
//!
//! Graphs may contain cycles and nodes reachable via several parents. The
//! engine keeps a [`VisitRecord`] per call to expand every node only once:
//!
//! - in [`Mode::Compact`] a re-visited node is emitted without children;
//! - in [`Mode::Synthesize`] it is followed by a continuation marker carrying
//!   [`TreeError::CycleDetected`] or [`TreeError::AlreadyVisited`].
//!
//! The first path that reaches a node expands it; later (even shorter) paths
//! never do.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, instrument, trace};

use crate::domain::element::Hierarchical;
use crate::domain::error::{TreeError, TreeResult};
use crate::domain::pool::WorkerPool;

/// Nesting depth up to which subtrees are expanded by plain recursion.
pub const DEFAULT_RECURSION_LIMIT: usize = 256;

/// Enumeration collaborator: knows identities and children of elements.
pub trait Source: Sync {
    type Element: Hierarchical + Send + 'static;
    type Id: Eq + Hash + Clone + Send + fmt::Debug;

    /// Identity used to recognise the same entity reached via different paths.
    fn id(&self, element: &Self::Element) -> Self::Id;

    /// Children in natural enumeration order, already positioned one level
    /// below `element`.
    fn children(&self, element: &Self::Element) -> TreeResult<Vec<Self::Element>>;

    /// Marker emitted after `element` instead of its children.
    fn continuation(&self, element: &Self::Element, reason: TreeError) -> Self::Element;

    /// True if `element` is one of its own ancestors.
    ///
    /// The default treats keys as node identities, which holds when keys are
    /// globally unique. Sources whose keys are only unique among siblings
    /// must override this.
    fn is_cycle(&self, element: &Self::Element) -> bool {
        element.history().contains(element.key())
    }
}

impl<S: Source> Source for &S {
    type Element = S::Element;
    type Id = S::Id;

    fn id(&self, element: &Self::Element) -> Self::Id {
        (**self).id(element)
    }

    fn children(&self, element: &Self::Element) -> TreeResult<Vec<Self::Element>> {
        (**self).children(element)
    }

    fn continuation(&self, element: &Self::Element, reason: TreeError) -> Self::Element {
        (**self).continuation(element, reason)
    }

    fn is_cycle(&self, element: &Self::Element) -> bool {
        (**self).is_cycle(element)
    }
}

/// How re-visited nodes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Emit the element only.
    #[default]
    Compact,
    /// Emit the element followed by a continuation marker.
    Synthesize,
}

/// Identities of nodes already expanded during one traversal.
#[derive(Debug)]
pub struct VisitRecord<I> {
    seen: HashSet<I>,
}

impl<I: Eq + Hash> VisitRecord<I> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, id: &I) -> bool {
        self.seen.contains(id)
    }

    /// Returns false if the id was already recorded.
    pub fn insert(&mut self, id: I) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<I: Eq + Hash> Default for VisitRecord<I> {
    fn default() -> Self {
        Self::new()
    }
}

enum Visit {
    Emit,
    Continue(TreeError),
    Expand,
}

/// Traversal engine over a [`Source`].
pub struct Closure<S> {
    source: S,
    mode: Mode,
    recursion_limit: usize,
}

impl<S: Source> Closure<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            mode: Mode::Compact,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Depth from which subtrees are expanded with an explicit work stack.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Sequential, deterministic exploration in enumeration order.
    #[instrument(level = "debug", skip_all, fields(mode = ?self.mode))]
    pub fn explore(&self, root: S::Element) -> Vec<S::Element> {
        let mut visited = VisitRecord::new();
        let mut result = Vec::new();
        self.expand(root, 0, &mut visited, &mut result);
        debug!(
            "explored {} elements, {} nodes expanded",
            result.len(),
            visited.len()
        );
        result
    }

    /// Concurrent exploration on `pool`.
    ///
    /// Emits the same elements per node as [`explore`](Self::explore), but the
    /// order across parallel branches is unspecified.
    #[instrument(level = "debug", skip_all, fields(mode = ?self.mode, threads = pool.size()))]
    pub fn explore_parallel(
        &self,
        root: S::Element,
        pool: &WorkerPool,
    ) -> TreeResult<Vec<S::Element>> {
        let threads = pool.get()?;
        let shared = Shared {
            result: Mutex::new(Vec::new()),
            visited: Mutex::new(VisitRecord::new()),
            pending: AtomicUsize::new(0),
        };
        // the scope returns only after every spawned work unit finished
        threads.scope(|scope| self.handle(scope, root, &shared));

        let result = shared
            .result
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("explored {} elements in parallel", result.len());
        Ok(result)
    }

    fn decide(&self, element: &S::Element, visited: &mut VisitRecord<S::Id>) -> Visit {
        // leaves, failed elements and markers never expand
        if !element.is_expandable() {
            return Visit::Emit;
        }
        let id = self.source.id(element);
        let cyclic = self.source.is_cycle(element);
        let seen = visited.contains(&id);
        match self.mode {
            Mode::Compact if cyclic || seen => Visit::Emit,
            Mode::Synthesize if cyclic => Visit::Continue(TreeError::CycleDetected),
            Mode::Synthesize if seen => Visit::Continue(TreeError::AlreadyVisited),
            _ => {
                visited.insert(id);
                Visit::Expand
            }
        }
    }

    fn expand(
        &self,
        mut element: S::Element,
        depth: usize,
        visited: &mut VisitRecord<S::Id>,
        out: &mut Vec<S::Element>,
    ) {
        if depth >= self.recursion_limit {
            trace!(depth, "switching to work stack");
            return self.expand_with_stack(element, visited, out);
        }
        match self.decide(&element, visited) {
            Visit::Emit => out.push(element),
            Visit::Continue(reason) => {
                let marker = self.source.continuation(&element, reason);
                out.push(element);
                out.push(marker);
            }
            Visit::Expand => match self.source.children(&element) {
                Err(err) => {
                    debug!(%err, "enumeration failed");
                    element.set_error(err);
                    out.push(element);
                }
                Ok(children) => {
                    out.push(element);
                    for child in children {
                        self.expand(child, depth + 1, visited, out);
                    }
                }
            },
        }
    }

    /// Same emission order as `expand`, without growing the call stack.
    fn expand_with_stack(
        &self,
        root: S::Element,
        visited: &mut VisitRecord<S::Id>,
        out: &mut Vec<S::Element>,
    ) {
        let mut stack = vec![root];
        while let Some(mut element) = stack.pop() {
            match self.decide(&element, visited) {
                Visit::Emit => out.push(element),
                Visit::Continue(reason) => {
                    let marker = self.source.continuation(&element, reason);
                    out.push(element);
                    out.push(marker);
                }
                Visit::Expand => match self.source.children(&element) {
                    Err(err) => {
                        debug!(%err, "enumeration failed");
                        element.set_error(err);
                        out.push(element);
                    }
                    Ok(children) => {
                        out.push(element);
                        // reversed, so the first child is expanded next
                        stack.extend(children.into_iter().rev());
                    }
                },
            }
        }
    }

    fn handle<'a>(&'a self, scope: &rayon::Scope<'a>, element: S::Element, shared: &'a Shared<S>) {
        if !element.is_expandable() {
            shared.add(element);
            return;
        }
        shared.pending.fetch_add(1, Ordering::SeqCst);
        scope.spawn(move |scope| {
            self.execute(scope, element, shared);
            let left = shared.pending.fetch_sub(1, Ordering::SeqCst) - 1;
            trace!(pending = left, "work unit done");
        });
    }

    fn execute<'a>(
        &'a self,
        scope: &rayon::Scope<'a>,
        mut element: S::Element,
        shared: &'a Shared<S>,
    ) {
        let decision = {
            let mut visited = shared.visited.lock().unwrap_or_else(PoisonError::into_inner);
            self.decide(&element, &mut visited)
        };
        match decision {
            Visit::Emit => shared.add(element),
            Visit::Continue(reason) => {
                let marker = self.source.continuation(&element, reason);
                shared.add(element);
                shared.add(marker);
            }
            Visit::Expand => match self.source.children(&element) {
                Err(err) => {
                    debug!(%err, "enumeration failed");
                    element.set_error(err);
                    shared.add(element);
                }
                Ok(children) => {
                    shared.add(element);
                    for child in children {
                        self.handle(scope, child, shared);
                    }
                }
            },
        }
    }
}

struct Shared<S: Source> {
    result: Mutex<Vec<S::Element>>,
    visited: Mutex<VisitRecord<S::Id>>,
    pending: AtomicUsize,
}

impl<S: Source> Shared<S> {
    fn add(&self, element: S::Element) {
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::{Entry, NodeKind};
    use std::collections::HashMap;

    /// Children by key; keys double as identities.
    struct MapSource {
        edges: HashMap<&'static str, Vec<&'static str>>,
        broken: Vec<&'static str>,
    }

    impl MapSource {
        fn new(edges: &[(&'static str, &[&'static str])]) -> Self {
            Self {
                edges: edges.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
                broken: Vec::new(),
            }
        }

        fn element(&self, key: &'static str, history: &[&'static str]) -> Entry<&'static str> {
            let kind = if self.edges.contains_key(key) {
                NodeKind::Branch
            } else {
                NodeKind::Leaf
            };
            Entry::new(key, history, kind)
        }
    }

    impl Source for MapSource {
        type Element = Entry<&'static str>;
        type Id = &'static str;

        fn id(&self, element: &Self::Element) -> Self::Id {
            element.key()
        }

        fn children(&self, element: &Self::Element) -> TreeResult<Vec<Self::Element>> {
            let key = *element.key();
            if self.broken.contains(&key) {
                return Err(TreeError::enumeration(key, "listing failed"));
            }
            Ok(self.edges[key]
                .iter()
                .map(|c| self.element(c, element.hierarchy()))
                .collect())
        }

        fn continuation(&self, element: &Self::Element, reason: TreeError) -> Self::Element {
            Entry::new("...", element.hierarchy(), NodeKind::Synthetic).with_error(reason)
        }
    }

    fn keys(elements: &[Entry<&'static str>]) -> Vec<String> {
        elements.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn given_cycle_when_synthesizing_then_marker_stops_recursion() {
        let src = MapSource::new(&[("a", &["b"]), ("b", &["a"])]);
        let root = src.element("a", &[]);
        let result = Closure::new(src).with_mode(Mode::Synthesize).explore(root);

        assert_eq!(keys(&result), ["a", "a/b", "a/b/a", "a/b/a/..."]);
        assert_eq!(result[3].error(), Some(&TreeError::CycleDetected));
    }

    #[test]
    fn given_cycle_when_compact_then_no_marker() {
        let src = MapSource::new(&[("a", &["b"]), ("b", &["a"])]);
        let root = src.element("a", &[]);
        let result = Closure::new(src).explore(root);

        assert_eq!(keys(&result), ["a", "a/b", "a/b/a"]);
        assert!(result.iter().all(|e| e.error().is_none()));
    }

    #[test]
    fn given_failing_child_when_exploring_then_siblings_continue() {
        let mut src = MapSource::new(&[("r", &["x", "y"]), ("x", &["z"]), ("y", &["w"])]);
        src.broken.push("x");
        let root = src.element("r", &[]);
        let result = Closure::new(src).explore(root);

        assert_eq!(keys(&result), ["r", "r/x", "r/y", "r/y/w"]);
        assert!(matches!(result[1].error(), Some(TreeError::Enumeration { .. })));
    }

    #[test]
    fn given_tiny_recursion_limit_when_exploring_then_output_is_unchanged() {
        let edges: &[(&'static str, &[&'static str])] = &[
            ("a", &["b", "c"]),
            ("b", &["d", "e"]),
            ("c", &["e", "a"]),
            ("e", &["f"]),
        ];
        let src = MapSource::new(edges);
        let root = src.element("a", &[]);
        let recursive = Closure::new(src).with_mode(Mode::Synthesize).explore(root);

        let src = MapSource::new(edges);
        let root = src.element("a", &[]);
        let stacked = Closure::new(src)
            .with_mode(Mode::Synthesize)
            .with_recursion_limit(0)
            .explore(root);

        assert_eq!(keys(&recursive), keys(&stacked));
    }
}
