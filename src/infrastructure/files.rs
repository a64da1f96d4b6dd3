//! Filesystem backend: directories are branches, everything else leaves.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde_json::{json, Map, Value};
use tracing::{instrument, trace};
use walkdir::WalkDir;

use crate::application::output::{FieldProvider, Manifest, OutputMode};
use crate::application::sort::{numeric, FieldComparator};
use crate::application::Catalog;
use crate::domain::{Hierarchical, NodeKind, Source, TopoInfo, TreeError, TreeResult};
use crate::util::path::join_native;

/// Key of continuation markers.
const MARKER: &str = "...";

/// Metadata captured when the element is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub mode: String,
    pub is_dir: bool,
    /// Modification time in nanoseconds since the epoch
    pub modified: Option<i128>,
}

impl FileInfo {
    fn from_metadata(meta: &fs::Metadata) -> Self {
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i128);
        Self {
            size: meta.len(),
            mode: mode_string(meta),
            is_dir: meta.is_dir(),
            modified,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileElement {
    topo: TopoInfo<String>,
    path: PathBuf,
    kind: NodeKind,
    info: Option<FileInfo>,
    error: Option<TreeError>,
}

impl FileElement {
    /// Element for `name` below `history`, resolved relative to `base`.
    ///
    /// Missing or unreadable files yield an element carrying a stat error.
    pub fn new(base: &Path, name: &str, history: &[String]) -> Self {
        let topo = TopoInfo::new(name.to_string(), history);
        let path = base.join(join_native(topo.hierarchy()));
        match fs::metadata(&path) {
            Ok(meta) => {
                let info = FileInfo::from_metadata(&meta);
                let kind = if info.is_dir {
                    NodeKind::Branch
                } else {
                    NodeKind::Leaf
                };
                Self {
                    topo,
                    path,
                    kind,
                    info: Some(info),
                    error: None,
                }
            }
            Err(e) => {
                trace!(path = %path.display(), "stat failed: {e}");
                let error = TreeError::stat(topo.path_string("/"), e);
                Self {
                    topo,
                    path,
                    kind: NodeKind::Leaf,
                    info: None,
                    error: Some(error),
                }
            }
        }
    }

    fn marker(parent: &FileElement, reason: TreeError) -> Self {
        Self {
            topo: parent.topo.child(MARKER.to_string()),
            path: parent.path.clone(),
            kind: NodeKind::Synthetic,
            info: None,
            error: Some(reason),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> Option<&FileInfo> {
        self.info.as_ref()
    }

    /// Key path joined with the platform separator, as shown in listings.
    pub fn display_path(&self) -> String {
        join_native(self.topo.hierarchy()).display().to_string()
    }

    fn error_text(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

impl Hierarchical for FileElement {
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

impl FieldProvider for FileElement {
    fn field_names(mode: OutputMode) -> Vec<&'static str> {
        match mode {
            OutputMode::Table => vec!["NAME", "ERROR"],
            _ => vec!["MODE", "NAME", "-SIZE", "ERROR"],
        }
    }

    fn fields(&self, mode: OutputMode) -> Vec<String> {
        let (file_mode, size) = match &self.info {
            Some(info) => (info.mode.clone(), info.size.to_string()),
            None => (String::new(), String::new()),
        };
        match mode {
            OutputMode::Table => vec![self.display_path(), self.error_text()],
            OutputMode::Tree => vec![file_mode, self.key().clone(), size, self.error_text()],
            _ => vec![file_mode, self.display_path(), size, self.error_text()],
        }
    }
}

impl Manifest for FileElement {
    fn as_manifest(&self) -> Value {
        let mut m = Map::new();
        m.insert("name".into(), json!(self.key()));
        if !self.history().is_empty() {
            m.insert("path".into(), json!(self.history().join("/")));
        }
        if let Some(info) = &self.info {
            m.insert("mode".into(), json!(info.mode));
            m.insert("size".into(), json!(info.size));
            if let Some(modified) = info.modified {
                m.insert("modtime".into(), json!(modified.to_string()));
            }
        }
        if let Some(err) = &self.error {
            m.insert("error".into(), json!(err.to_string()));
        }
        Value::Object(m)
    }
}

/// Files below a base directory; root specs are relative to it.
#[derive(Debug, Clone)]
pub struct FileSource {
    base: PathBuf,
    list_directories: bool,
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSource {
    /// Source resolving specs against the current directory.
    pub fn new() -> Self {
        Self::with_base(PathBuf::new())
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            list_directories: false,
        }
    }

    /// Show directory roots themselves instead of their content.
    pub fn with_directories(mut self, enabled: bool) -> Self {
        self.list_directories = enabled;
        self
    }

    pub fn element(&self, spec: &str) -> FileElement {
        FileElement::new(&self.base, spec, &[])
    }
}

impl Source for FileSource {
    type Element = FileElement;
    type Id = PathBuf;

    /// Canonical path, so symlinked directories are recognised as visited.
    fn id(&self, element: &FileElement) -> PathBuf {
        fs::canonicalize(element.path()).unwrap_or_else(|_| element.path().to_path_buf())
    }

    #[instrument(level = "trace", skip_all, fields(path = %element.path().display()))]
    fn children(&self, element: &FileElement) -> TreeResult<Vec<FileElement>> {
        let history = element.hierarchy();
        WalkDir::new(element.path())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                let entry =
                    entry.map_err(|e| TreeError::enumeration(element.topo().path_string("/"), e))?;
                let name = entry.file_name().to_string_lossy();
                Ok(FileElement::new(&self.base, &name, history))
            })
            .collect()
    }

    fn continuation(&self, element: &FileElement, reason: TreeError) -> FileElement {
        FileElement::marker(element, reason)
    }

    /// Names repeat freely in a file tree (`x/sub/x`); only a directory that
    /// resolves to the same canonical path as an ancestor is a cycle.
    fn is_cycle(&self, element: &FileElement) -> bool {
        let id = self.id(element);
        let history = element.history();
        (1..=history.len()).any(|n| {
            fs::canonicalize(self.base.join(join_native(&history[..n])))
                .is_ok_and(|ancestor| ancestor == id)
        })
    }
}

impl Catalog for FileSource {
    fn roots(&self, specs: &[String], closure: bool) -> Vec<FileElement> {
        let mut roots = Vec::new();
        for spec in specs {
            let mut element = self.element(spec);
            if closure || self.list_directories || !element.is_expandable() {
                roots.push(element);
                continue;
            }
            match self.children(&element) {
                Ok(children) => roots.extend(children),
                Err(err) => {
                    element.set_error(err);
                    roots.push(element);
                }
            }
        }
        roots
    }

    fn comparators(&self) -> Vec<(&'static str, FieldComparator)> {
        vec![("size", numeric as FieldComparator)]
    }
}

/// `ls -l` style mode string, e.g. `drwxr-xr-x`.
pub fn mode_string(meta: &fs::Metadata) -> String {
    let kind = if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'L'
    } else {
        '-'
    };
    let bits = permission_bits(meta);
    let mut s = String::with_capacity(10);
    s.push(kind);
    for shift in [6, 3, 0] {
        let triple = (bits >> shift) & 0o7;
        s.push(if triple & 0o4 != 0 { 'r' } else { '-' });
        s.push(if triple & 0o2 != 0 { 'w' } else { '-' });
        s.push(if triple & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    let base = if meta.is_dir() { 0o777 } else { 0o666 };
    if meta.permissions().readonly() {
        base & 0o555
    } else {
        base
    }
}
