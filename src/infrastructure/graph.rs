//! In-memory graph backend.
//!
//! Nodes live in a [`generational_arena::Arena`] and refer to their children
//! by [`Index`]. Edges may form cycles and nodes may have several parents;
//! the closure engine turns the graph into a tree by path.

use generational_arena::{Arena, Index};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument};

use crate::application::output::{FieldProvider, Manifest, OutputMode};
use crate::application::Catalog;
use crate::domain::{Hierarchical, NodeKind, Source, TopoInfo, TreeError, TreeResult};

const MARKER: &str = "...";

#[derive(Debug, Clone)]
pub struct GraphNode {
    name: String,
    value: String,
    children: Vec<Index>,
}

impl GraphNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn children(&self) -> &[Index] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Graph {
    nodes: Arena<GraphNode>,
    roots: Vec<Index>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str, value: &str) -> Index {
        self.nodes.insert(GraphNode {
            name: name.to_string(),
            value: value.to_string(),
            children: Vec::new(),
        })
    }

    /// Add an edge `parent → child`. Both handles must belong to this graph.
    pub fn add_child(&mut self, parent: Index, child: Index) -> TreeResult<()> {
        if !self.nodes.contains(child) {
            return Err(TreeError::UnknownNode(format!("{child:?}")));
        }
        let node = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| TreeError::UnknownNode(format!("{parent:?}")))?;
        node.children.push(child);
        Ok(())
    }

    /// Register a node as a possible starting point.
    pub fn add_root(&mut self, node: Index) -> TreeResult<()> {
        if !self.nodes.contains(node) {
            return Err(TreeError::UnknownNode(format!("{node:?}")));
        }
        self.roots.push(node);
        Ok(())
    }

    pub fn node(&self, index: Index) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    /// Root registered under `name`.
    pub fn root(&self, name: &str) -> Option<Index> {
        self.roots
            .iter()
            .copied()
            .find(|i| self.nodes.get(*i).is_some_and(|n| n.name == name))
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Small sample graph with a cycle (b → c) and shared nodes (d, e).
    ///
    /// ```text
    /// c(charly) → b, a, e
    /// a(alice)  → d, e
    /// b(bob)    → d, c
    /// e(eve)    → d
    /// ```
    pub fn demo() -> TreeResult<Self> {
        let mut g = Self::new();
        let a = g.add_node("a", "alice");
        let b = g.add_node("b", "bob");
        let c = g.add_node("c", "charly");
        let d = g.add_node("d", "david");
        let e = g.add_node("e", "eve");

        g.add_child(a, d)?;
        g.add_child(a, e)?;
        g.add_child(b, d)?;
        g.add_child(c, b)?;
        g.add_child(c, a)?;
        g.add_child(c, e)?;
        g.add_child(e, d)?;
        g.add_child(b, c)?;

        g.add_root(c)?;
        Ok(g)
    }
}

#[derive(Debug, Clone)]
pub struct GraphElement {
    topo: TopoInfo<String>,
    node: Option<Index>,
    value: String,
    kind: NodeKind,
    error: Option<TreeError>,
}

impl GraphElement {
    pub fn new(graph: &Graph, index: Index, history: &[String]) -> Self {
        match graph.node(index) {
            Some(n) => Self {
                topo: TopoInfo::new(n.name.clone(), history),
                node: Some(index),
                value: n.value.clone(),
                kind: if n.has_children() {
                    NodeKind::Branch
                } else {
                    NodeKind::Leaf
                },
                error: None,
            },
            None => Self::unknown(&format!("{index:?}")),
        }
    }

    /// Root element for a name without a node.
    pub fn unknown(name: &str) -> Self {
        Self {
            topo: TopoInfo::new(name.to_string(), &[]),
            node: None,
            value: String::new(),
            kind: NodeKind::Leaf,
            error: Some(TreeError::UnknownNode(name.to_string())),
        }
    }

    fn marker(parent: &GraphElement, reason: TreeError) -> Self {
        Self {
            topo: parent.topo.child(MARKER.to_string()),
            node: None,
            value: String::new(),
            kind: NodeKind::Synthetic,
            error: Some(reason),
        }
    }

    pub fn node(&self) -> Option<Index> {
        self.node
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn path(&self) -> String {
        self.topo.path_string("/")
    }

    fn error_text(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

impl Hierarchical for GraphElement {
    type Key = String;

    fn topo(&self) -> &TopoInfo<String> {
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
}

impl FieldProvider for GraphElement {
    fn field_names(mode: OutputMode) -> Vec<&'static str> {
        match mode {
            OutputMode::Table => vec!["NAME", "ERROR"],
            _ => vec!["NAME", "VALUE", "ERROR"],
        }
    }

    fn fields(&self, mode: OutputMode) -> Vec<String> {
        match mode {
            OutputMode::Table => vec![self.path(), self.error_text()],
            OutputMode::Tree => vec![self.key().clone(), self.value.clone(), self.error_text()],
            _ => vec![self.path(), self.value.clone(), self.error_text()],
        }
    }
}

impl Manifest for GraphElement {
    fn as_manifest(&self) -> Value {
        let mut m = Map::new();
        m.insert("name".into(), json!(self.key()));
        m.insert("value".into(), json!(self.value));
        if !self.history().is_empty() {
            m.insert("path".into(), json!(self.history().join("/")));
        }
        if let Some(err) = &self.error {
            m.insert("error".into(), json!(err.to_string()));
        }
        Value::Object(m)
    }
}

/// Exposes a [`Graph`] to the closure engine.
#[derive(Debug, Clone, Copy)]
pub struct GraphSource<'g> {
    graph: &'g Graph,
}

impl<'g> GraphSource<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    pub fn element(&self, name: &str) -> GraphElement {
        match self.graph.root(name) {
            Some(index) => GraphElement::new(self.graph, index, &[]),
            None => GraphElement::unknown(name),
        }
    }
}

impl Source for GraphSource<'_> {
    type Element = GraphElement;
    type Id = Option<Index>;

    fn id(&self, element: &GraphElement) -> Option<Index> {
        element.node
    }

    #[instrument(level = "trace", skip_all, fields(node = %element.key()))]
    fn children(&self, element: &GraphElement) -> TreeResult<Vec<GraphElement>> {
        let node = element
            .node
            .and_then(|i| self.graph.node(i))
            .ok_or_else(|| TreeError::UnknownNode(element.key().clone()))?;
        Ok(node
            .children
            .iter()
            .map(|c| GraphElement::new(self.graph, *c, element.hierarchy()))
            .collect())
    }

    fn continuation(&self, element: &GraphElement, reason: TreeError) -> GraphElement {
        GraphElement::marker(element, reason)
    }
}

impl Catalog for GraphSource<'_> {
    /// Named roots; without names every registered root.
    fn roots(&self, specs: &[String], _closure: bool) -> Vec<GraphElement> {
        if specs.is_empty() {
            debug!("no roots given, using all {}", self.graph.roots.len());
            return self
                .graph
                .roots
                .iter()
                .map(|i| GraphElement::new(self.graph, *i, &[]))
                .collect();
        }
        specs.iter().map(|s| self.element(s)).collect()
    }
}
