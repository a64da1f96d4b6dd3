//! Tests for the closure engine over the in-memory graph backend.

use std::collections::{BTreeSet, HashSet};

use rstest::{fixture, rstest};

use hiertree::domain::{Closure, Hierarchical, Mode, TreeError, WorkerPool};
use hiertree::infrastructure::{Graph, GraphElement, GraphSource};
use hiertree::util::testing;

fn paths(elements: &[GraphElement]) -> Vec<String> {
    elements.iter().map(GraphElement::path).collect()
}

/// Elements followed by at least one real child.
fn expanded(elements: &[GraphElement]) -> Vec<&GraphElement> {
    elements
        .iter()
        .filter(|e| {
            elements
                .iter()
                .any(|c| c.key().as_str() != "..." && c.history() == e.hierarchy())
        })
        .collect()
}

fn count_errors(elements: &[GraphElement], error: &TreeError) -> usize {
    elements.iter().filter(|e| e.error() == Some(error)).count()
}

/// r → a, b; a → c; b → c; c → x
#[fixture]
fn diamond() -> Graph {
    testing::init_test_setup();
    let mut g = Graph::new();
    let r = g.add_node("r", "root");
    let a = g.add_node("a", "left");
    let b = g.add_node("b", "right");
    let c = g.add_node("c", "shared");
    let x = g.add_node("x", "leaf");
    g.add_child(r, a).unwrap();
    g.add_child(r, b).unwrap();
    g.add_child(a, c).unwrap();
    g.add_child(b, c).unwrap();
    g.add_child(c, x).unwrap();
    g.add_root(r).unwrap();
    g
}

/// t → u, v; u → w, y; v → z (no shared nodes)
#[fixture]
fn tree() -> Graph {
    testing::init_test_setup();
    let mut g = Graph::new();
    let t = g.add_node("t", "");
    let u = g.add_node("u", "");
    let v = g.add_node("v", "");
    let w = g.add_node("w", "");
    let y = g.add_node("y", "");
    let z = g.add_node("z", "");
    g.add_child(t, u).unwrap();
    g.add_child(t, v).unwrap();
    g.add_child(u, w).unwrap();
    g.add_child(u, y).unwrap();
    g.add_child(v, z).unwrap();
    g.add_root(t).unwrap();
    g
}

#[rstest]
fn given_reconverging_dag_when_synthesizing_then_second_visit_gets_marker(diamond: Graph) {
    let source = GraphSource::new(&diamond);
    let root = source.element("r");
    let result = Closure::new(source).with_mode(Mode::Synthesize).explore(root);

    assert_eq!(
        paths(&result),
        ["r", "r/a", "r/a/c", "r/a/c/x", "r/b", "r/b/c", "r/b/c/..."]
    );
    assert_eq!(result[6].error(), Some(&TreeError::AlreadyVisited));
    assert_eq!(result[6].history(), ["r", "b", "c"]);
}

#[rstest]
fn given_reconverging_dag_when_compact_then_no_duplicate_children(diamond: Graph) {
    let source = GraphSource::new(&diamond);
    let root = source.element("r");
    let result = Closure::new(source).explore(root);

    assert_eq!(paths(&result), ["r", "r/a", "r/a/c", "r/a/c/x", "r/b", "r/b/c"]);
    assert!(result.iter().all(|e| e.error().is_none()));
}

#[rstest]
#[case(Mode::Compact)]
#[case(Mode::Synthesize)]
fn given_demo_graph_when_exploring_then_history_extends_parent(#[case] mode: Mode) {
    testing::init_test_setup();
    let graph = Graph::demo().unwrap();
    let source = GraphSource::new(&graph);
    let root = source.element("c");
    let result = Closure::new(source).with_mode(mode).explore(root);

    for (i, element) in result.iter().enumerate().skip(1) {
        // pre-order: the parent is the closest preceding element at the history
        let parent = result[..i]
            .iter()
            .rev()
            .find(|p| p.hierarchy() == element.history());
        assert!(parent.is_some(), "no parent for {}", element.path());
    }
}

#[rstest]
fn given_unknown_root_when_exploring_then_only_error_element(diamond: Graph) {
    let source = GraphSource::new(&diamond);
    let root = source.element("nope");
    let result = Closure::new(source).explore(root);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].error(), Some(&TreeError::UnknownNode("nope".into())));
}

#[rstest]
#[case(Mode::Compact)]
#[case(Mode::Synthesize)]
fn given_tree_shaped_graph_when_parallel_then_same_elements_as_sequential(
    tree: Graph,
    #[case] mode: Mode,
) {
    let source = GraphSource::new(&tree);
    let closure = Closure::new(source).with_mode(mode);

    let sequential: BTreeSet<String> = paths(&closure.explore(source.element("t")))
        .into_iter()
        .collect();
    let pool = WorkerPool::new(4);
    let parallel = closure.explore_parallel(source.element("t"), &pool).unwrap();
    assert!(pool.close());

    assert_eq!(parallel.len(), sequential.len());
    assert_eq!(paths(&parallel).into_iter().collect::<BTreeSet<_>>(), sequential);
}

#[rstest]
fn given_closed_pool_when_exploring_then_pool_error(tree: Graph) {
    let source = GraphSource::new(&tree);
    let pool = WorkerPool::new(2);
    pool.close();
    let err = Closure::new(source)
        .explore_parallel(source.element("t"), &pool)
        .unwrap_err();
    assert!(matches!(err, TreeError::Pool(_)));
}

#[rstest]
#[case(1)]
#[case(4)]
fn given_demo_graph_when_parallel_synthesize_then_one_marker_per_revisit(
    #[case] threads: usize,
) {
    testing::init_test_setup();
    let graph = Graph::demo().unwrap();
    let source = GraphSource::new(&graph);
    let closure = Closure::new(source).with_mode(Mode::Synthesize);
    let pool = WorkerPool::new(threads);

    for _ in 0..20 {
        let result = closure.explore_parallel(source.element("c"), &pool).unwrap();

        assert_eq!(result.len(), 11);
        assert_eq!(count_errors(&result, &TreeError::CycleDetected), 1);
        assert_eq!(count_errors(&result, &TreeError::AlreadyVisited), 1);
        let cycle = result
            .iter()
            .find(|e| e.error() == Some(&TreeError::CycleDetected))
            .unwrap();
        assert_eq!(cycle.history(), ["c", "b", "c"]);

        let nodes: Vec<_> = expanded(&result).iter().map(|e| e.node()).collect();
        let unique: HashSet<_> = nodes.iter().collect();
        assert_eq!(nodes.len(), unique.len(), "node expanded twice: {:?}", paths(&result));
    }
    assert!(pool.close());
}

#[rstest]
#[case(Mode::Compact, 6)]
#[case(Mode::Synthesize, 7)]
fn given_reconverging_dag_when_parallel_then_shared_node_expanded_once(
    diamond: Graph,
    #[case] mode: Mode,
    #[case] expected: usize,
) {
    let source = GraphSource::new(&diamond);
    let closure = Closure::new(source).with_mode(mode);
    let pool = WorkerPool::new(4);

    for _ in 0..20 {
        let result = closure.explore_parallel(source.element("r"), &pool).unwrap();

        assert_eq!(result.len(), expected);
        let leaves = result.iter().filter(|e| e.key() == "x").count();
        assert_eq!(leaves, 1, "shared subtree listed twice: {:?}", paths(&result));
        assert_eq!(count_errors(&result, &TreeError::CycleDetected), 0);
        let markers = usize::from(mode == Mode::Synthesize);
        assert_eq!(count_errors(&result, &TreeError::AlreadyVisited), markers);

        let expanded_c = expanded(&result)
            .iter()
            .filter(|e| e.key() == "c")
            .count();
        assert_eq!(expanded_c, 1);
    }
    assert!(pool.close());
}
