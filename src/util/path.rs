use std::path::{Path, PathBuf};

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
///
/// Unresolvable variables leave the input unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_vars(&path.to_string_lossy()))
}

/// Render a key path with the platform separator.
pub fn join_native<S: AsRef<str>>(parts: &[S]) -> PathBuf {
    parts.iter().map(|p| AsRef::<str>::as_ref(p)).collect()
}
