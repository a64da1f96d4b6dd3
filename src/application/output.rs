//! Rendering of processed element lists: tables, trees and manifests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Hierarchical, Mode, RowObject, TreeRow};

const EMPTY: &str = "no elements found\n";

/// Cells longer than this switch the table to a key/value listing.
const MAX_CELL_WIDTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    #[serde(alias = "")]
    Table,
    Wide,
    Tree,
    Json,
    Yaml,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Table => "table",
            OutputMode::Wide => "wide",
            OutputMode::Tree => "tree",
            OutputMode::Json => "json",
            OutputMode::Yaml => "yaml",
        }
    }

    /// Manifest modes render structured documents instead of columns.
    pub fn is_manifest(self) -> bool {
        matches!(self, OutputMode::Json | OutputMode::Yaml)
    }

    /// Continuation markers are only useful when the hierarchy is drawn.
    pub fn closure_mode(self) -> Mode {
        match self {
            OutputMode::Tree => Mode::Synthesize,
            _ => Mode::Compact,
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "table" => Ok(OutputMode::Table),
            "wide" => Ok(OutputMode::Wide),
            "tree" => Ok(OutputMode::Tree),
            "json" => Ok(OutputMode::Json),
            "yaml" => Ok(OutputMode::Yaml),
            _ => Err(ApplicationError::InvalidOutputMode(s.to_string())),
        }
    }
}

/// Column view of an element.
pub trait FieldProvider {
    /// Column headers for `mode`. A leading `-` marks a right-aligned column.
    fn field_names(mode: OutputMode) -> Vec<&'static str>
    where
        Self: Sized;

    /// Cell values, one per header of [`field_names`](Self::field_names).
    fn fields(&self, mode: OutputMode) -> Vec<String>;
}

/// Structured view of an element for JSON/YAML output.
pub trait Manifest {
    fn as_manifest(&self) -> Value;
}

/// Headers for tree output: the connector graph comes first.
pub fn tree_headers<E: FieldProvider>() -> Vec<&'static str> {
    let mut headers = vec![""];
    headers.extend(E::field_names(OutputMode::Tree));
    headers
}

/// Map synthesized tree rows to table rows.
///
/// Bare placeholders show their key next to the graph and leave all other
/// columns blank.
pub fn tree_table<E>(rows: &[TreeRow<'_, E>]) -> Vec<Vec<String>>
where
    E: Hierarchical + FieldProvider,
{
    let width = E::field_names(OutputMode::Tree).len();
    rows.iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(width + 1);
            match &row.object {
                RowObject::Element(e) => {
                    cells.push(row.graph.clone());
                    cells.extend(e.fields(OutputMode::Tree));
                }
                RowObject::Created(e) => {
                    cells.push(row.graph.clone());
                    cells.extend(e.fields(OutputMode::Tree));
                }
                RowObject::Node(n) => {
                    cells.push(format!("{} {}", row.graph, n.key));
                    cells.resize(width + 1, String::new());
                }
            }
            cells
        })
        .collect()
}

/// Format rows as aligned columns.
///
/// Headers starting with `-` are right-aligned, the last left-aligned column
/// is not padded. If any cell is wider than 200 characters (and there are
/// more than two columns) every row is printed as a `header: value` listing
/// instead.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return EMPTY.to_string();
    }
    let mut right = Vec::with_capacity(headers.len());
    let mut titles = Vec::with_capacity(headers.len());
    for h in headers {
        match h.strip_prefix('-') {
            Some(t) => {
                right.push(true);
                titles.push(t.to_string());
            }
            None => {
                right.push(false);
                titles.push(h.to_string());
            }
        }
    }

    let mut widths: Vec<usize> = Vec::new();
    let mut max_len = 0;
    for row in std::iter::once(&titles).chain(rows) {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if i >= widths.len() {
                widths.push(len);
            } else if widths[i] < len {
                widths[i] = len;
            }
            max_len = max_len.max(len);
        }
    }

    if widths.len() > 2 && max_len > MAX_CELL_WIDTH {
        return format_listing(&titles, rows);
    }

    let mut out = String::new();
    for row in std::iter::once(&titles).chain(rows) {
        let mut line = String::new();
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let right_aligned = right.get(i).copied().unwrap_or(false);
            let pad = width.saturating_sub(cell.chars().count());
            if i > 0 {
                line.push(' ');
            }
            if right_aligned {
                line.push_str(&" ".repeat(pad));
                line.push_str(cell);
            } else {
                line.push_str(cell);
                if i + 1 < widths.len() {
                    line.push_str(&" ".repeat(pad));
                }
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn format_listing(titles: &[String], rows: &[Vec<String>]) -> String {
    let title_width = titles.iter().map(|t| t.len()).max().unwrap_or(0);
    let mut out = String::new();
    for row in rows {
        for (c, cell) in row.iter().enumerate() {
            match titles.get(c) {
                Some(t) => out.push_str(&format!("{t:<title_width$}: {cell}\n")),
                None => out.push_str(&format!("{c}: {cell}\n")),
            }
        }
        if !row.is_empty() {
            out.push_str("---\n");
        }
    }
    out
}

/// Render manifests as `{"items": [...]}` in the given manifest mode.
pub fn format_manifests(mode: OutputMode, items: Vec<Value>) -> ApplicationResult<String> {
    if items.is_empty() {
        return Ok(EMPTY.to_string());
    }
    let doc = json!({ "items": items });
    match mode {
        OutputMode::Json => {
            let mut s = serde_json::to_string_pretty(&doc)
                .map_err(|e| ApplicationError::render(format!("json: {e}")))?;
            s.push('\n');
            Ok(s)
        }
        OutputMode::Yaml => serde_yaml::to_string(&doc)
            .map_err(|e| ApplicationError::render(format!("yaml: {e}"))),
        other => Err(ApplicationError::render(format!(
            "{other} is not a manifest output"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn given_right_aligned_header_when_formatting_then_pads_left() {
        let out = format_table(
            &["NAME", "-SIZE", "ERROR"],
            &[row(&["a", "5", ""]), row(&["long-name", "12345", "boom"])],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], format!("{:<9} {:>5} ERROR", "NAME", "SIZE"));
        assert_eq!(lines[1], format!("{:<9} {:>5}", "a", "5"));
        assert_eq!(lines[2], "long-name 12345 boom");
    }

    #[test]
    fn given_no_rows_when_formatting_then_reports_empty() {
        assert_eq!(format_table(&["NAME"], &[]), "no elements found\n");
    }

    #[test]
    fn given_huge_cell_when_formatting_then_lists_key_values() {
        let big = "x".repeat(201);
        let out = format_table(&["A", "B", "C"], &[row(&["1", "2", &big])]);
        assert!(out.starts_with("A: 1\nB: 2\nC: x"));
        assert!(out.ends_with("---\n"));
    }

    #[test]
    fn given_manifests_when_formatting_json_then_wraps_items() {
        let out = format_manifests(OutputMode::Json, vec![json!({"name": "a"})]).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["items"][0]["name"], "a");
    }

    #[test]
    fn given_manifests_when_formatting_yaml_then_wraps_items() {
        let out = format_manifests(OutputMode::Yaml, vec![json!({"name": "a"})]).unwrap();
        assert!(out.contains("items:"));
        assert!(out.contains("name: a"));
    }

    #[rstest]
    #[case("", OutputMode::Table)]
    #[case("wide", OutputMode::Wide)]
    #[case("TREE", OutputMode::Tree)]
    #[case("yaml", OutputMode::Yaml)]
    fn given_mode_name_when_parsing_then_resolves(#[case] input: &str, #[case] expected: OutputMode) {
        assert_eq!(input.parse::<OutputMode>().unwrap(), expected);
    }

    #[test]
    fn given_unknown_mode_when_parsing_then_error() {
        let err = "xml".parse::<OutputMode>().unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidOutputMode(m) if m == "xml"));
    }

    #[test]
    fn given_tree_mode_when_asking_closure_mode_then_synthesize() {
        assert_eq!(OutputMode::Tree.closure_mode(), Mode::Synthesize);
        assert_eq!(OutputMode::Json.closure_mode(), Mode::Compact);
    }
}
