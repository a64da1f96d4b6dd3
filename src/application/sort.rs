//! Field based sort criteria.
//!
//! Criteria are field names as shown in the output headers, matched case
//! insensitively. A leading `-` sorts descending. The first criterion is the
//! primary one; later criteria break ties.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::application::output::{FieldProvider, OutputMode};
use crate::application::{ApplicationError, ApplicationResult};

/// Comparison function for the string values of one field.
pub type FieldComparator = fn(&str, &str) -> Ordering;

/// Compare values as integers; values that do not parse sort by string.
pub fn numeric(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn lexical(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub descending: bool,
}

impl FromStr for SortField {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (name, descending) = match s.strip_prefix('-') {
            Some(rest) => (rest.to_string(), true),
            None => (s, false),
        };
        if name.is_empty() {
            return Err(ApplicationError::InvalidSortField(vec![name]));
        }
        Ok(Self { name, descending })
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Unvalidated sort criteria plus per-field comparators.
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    fields: Vec<SortField>,
    comparators: HashMap<String, FieldComparator>,
}

impl SortSpec {
    /// Parse criteria; every item may hold a comma separated list.
    pub fn parse<I, S>(items: I) -> ApplicationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Vec::new();
        for item in items {
            for part in item.as_ref().split(',').filter(|p| !p.trim().is_empty()) {
                fields.push(part.parse()?);
            }
        }
        Ok(Self {
            fields,
            comparators: HashMap::new(),
        })
    }

    /// Use `cmp` for the field `name` instead of string comparison.
    pub fn with_comparator(mut self, name: &str, cmp: FieldComparator) -> Self {
        self.comparators.insert(name.to_lowercase(), cmp);
        self
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve the criteria against the headers of an output.
    ///
    /// All unknown names are reported at once, sorted.
    pub fn resolve(&self, headers: &[&str]) -> ApplicationResult<ResolvedSort> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('-').to_lowercase())
            .collect();
        let mut keys = Vec::with_capacity(self.fields.len());
        let mut unknown = Vec::new();
        for field in &self.fields {
            match names.iter().position(|n| *n == field.name) {
                Some(index) => keys.push(SortKey {
                    index,
                    descending: field.descending,
                    cmp: self
                        .comparators
                        .get(&field.name)
                        .copied()
                        .unwrap_or(lexical),
                }),
                None => unknown.push(field.name.clone()),
            }
        }
        if !unknown.is_empty() {
            unknown.sort();
            return Err(ApplicationError::InvalidSortField(unknown));
        }
        Ok(ResolvedSort { keys })
    }
}

#[derive(Debug, Clone, Copy)]
struct SortKey {
    index: usize,
    descending: bool,
    cmp: FieldComparator,
}

/// Sort criteria bound to column positions.
#[derive(Debug, Clone)]
pub struct ResolvedSort {
    keys: Vec<SortKey>,
}

impl ResolvedSort {
    pub fn compare(&self, a: &[String], b: &[String]) -> Ordering {
        for key in &self.keys {
            let x = a.get(key.index).map(String::as_str).unwrap_or("");
            let y = b.get(key.index).map(String::as_str).unwrap_or("");
            let order = (key.cmp)(x, y);
            if order != Ordering::Equal {
                return if key.descending { order.reverse() } else { order };
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `elements` by the fields they show in `mode`.
    pub fn sort<E: FieldProvider>(&self, elements: &mut Vec<E>, mode: OutputMode) {
        if self.keys.is_empty() {
            return;
        }
        debug!(criteria = self.keys.len(), "sorting {} elements", elements.len());
        let mut keyed: Vec<(Vec<String>, E)> =
            elements.drain(..).map(|e| (e.fields(mode), e)).collect();
        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));
        elements.extend(keyed.into_iter().map(|(_, e)| e));
    }
}
