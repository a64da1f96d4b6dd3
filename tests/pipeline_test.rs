//! End-to-end tests for the processing pipeline over the sample graph.

use rstest::{fixture, rstest};

use hiertree::application::{ApplicationError, OutputMode, Pipeline};
use hiertree::config::Settings;
use hiertree::infrastructure::{Graph, GraphSource};
use hiertree::util::testing;

#[fixture]
fn graph() -> Graph {
    testing::init_test_setup();
    Graph::demo().unwrap()
}

fn run(graph: &Graph, settings: Settings, roots: &[&str]) -> Result<(usize, String), ApplicationError> {
    let pipeline = Pipeline::new(settings)?;
    let roots: Vec<String> = roots.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();
    let n = pipeline.process(&roots, &GraphSource::new(graph), &mut out)?;
    pipeline.close();
    Ok((n, String::from_utf8(out).unwrap()))
}

/// Node name shown after the connector graph.
fn key_after<'a>(line: &'a str, graph: &str) -> Option<&'a str> {
    line.strip_prefix(graph)?.split_whitespace().next()
}

#[rstest]
fn given_value_sort_when_rendering_tree_then_siblings_follow_values(graph: Graph) {
    let settings = Settings {
        closure: true,
        sort: vec!["-value".to_string()],
        output: OutputMode::Tree,
        ..Settings::default()
    };
    let (n, out) = run(&graph, settings, &["c"]).unwrap();
    assert_eq!(n, 11);

    let expected = [
        ("└─ ⊗", "c"),
        ("   ├─ ⊗", "e"),
        ("   │  └─", "..."),
        ("   ├─ ⊗", "b"),
        ("   │  ├─", "d"),
        ("   │  └─ ⊗", "c"),
        ("   │     └─", "..."),
        ("   └─ ⊗", "a"),
        ("      ├─ ⊗", "e"),
        ("      │  └─", "d"),
        ("      └─", "d"),
    ];
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].split_whitespace().eq(["NAME", "VALUE", "ERROR"]));
    for (line, (prefix, key)) in lines[1..].iter().zip(expected) {
        assert_eq!(key_after(line, prefix), Some(key), "unexpected row {line:?}");
    }
    assert!(lines[3].ends_with("already shown"));
    assert!(lines[7].ends_with("cycle"));
}

#[rstest]
fn given_closure_when_rendering_table_then_markers_are_omitted(graph: Graph) {
    let settings = Settings {
        closure: true,
        ..Settings::default()
    };
    let (n, out) = run(&graph, settings, &["c"]).unwrap();
    assert_eq!(n, 9);
    assert!(!out.contains("..."));
    assert!(out.lines().any(|l| l.trim_end() == "c/a/e/d"));
}

#[rstest]
fn given_unknown_root_when_rendering_then_error_column_is_filled(graph: Graph) {
    let (n, out) = run(&graph, Settings::default(), &["c", "zz"]).unwrap();
    assert_eq!(n, 2);
    assert!(out.lines().any(|l| l.starts_with("zz") && l.ends_with("unknown node")));
}

#[rstest]
fn given_no_roots_when_rendering_then_uses_registered_roots(graph: Graph) {
    let (n, out) = run(&graph, Settings::default(), &[]).unwrap();
    assert_eq!(n, 1);
    assert_eq!(out, "NAME ERROR\nc\n");
}

#[rstest]
fn given_yaml_output_when_rendering_then_items_document(graph: Graph) {
    let settings = Settings {
        closure: true,
        output: OutputMode::Yaml,
        ..Settings::default()
    };
    let (n, out) = run(&graph, settings, &["c"]).unwrap();
    assert_eq!(n, 9);
    let doc: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
    let items = doc["items"].as_sequence().unwrap();
    assert_eq!(items.len(), 9);
    assert_eq!(items[0]["name"].as_str(), Some("c"));
    assert_eq!(items[0]["value"].as_str(), Some("charly"));
}

#[rstest]
#[case(&["nope"], "invalid sort fields: [nope]")]
#[case(&["size", "-alpha"], "invalid sort fields: [alpha size]")]
fn given_unknown_sort_fields_when_processing_then_rejected(
    graph: Graph,
    #[case] sort: &[&str],
    #[case] message: &str,
) {
    let settings = Settings {
        sort: sort.iter().map(|s| s.to_string()).collect(),
        ..Settings::default()
    };
    let err = run(&graph, settings, &["c"]).unwrap_err();
    assert_eq!(err.to_string(), message);
}

#[test]
fn given_empty_result_when_rendering_then_reports_nothing_found() {
    testing::init_test_setup();
    let empty = Graph::new();
    let (n, out) = run(&empty, Settings::default(), &[]).unwrap();
    assert_eq!(n, 0);
    assert_eq!(out, "no elements found\n");
}
