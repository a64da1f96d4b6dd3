//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/hiertree/hiertree.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `HIERTREE_*` prefix
//!
//! Command line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, IoResultExt, OutputMode};
use crate::domain::tree::NODE_SYMBOL;
use crate::util::path::expand_path;

/// Effective settings of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Explore everything reachable from the given roots
    pub closure: bool,
    /// Worker threads for exploration, 0 = sequential
    pub parallel: usize,
    /// Sort fields, `-` prefix for descending order
    pub sort: Vec<String>,
    pub output: OutputMode,
    /// Symbol tagging tree rows that have children
    pub node_symbol: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            closure: false,
            parallel: 0,
            sort: Vec::new(),
            output: OutputMode::Table,
            node_symbol: NODE_SYMBOL.to_string(),
        }
    }
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified in this layer, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub closure: Option<bool>,
    pub parallel: Option<usize>,
    pub sort: Option<Vec<String>>,
    pub output: Option<OutputMode>,
    pub node_symbol: Option<String>,
}

/// Get the XDG config directory for hiertree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hiertree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("hiertree.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).with_path_context("read config", path)?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; it must exist
    ///
    /// Every layer replaces the values it specifies, lists included.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            let path = expand_path(path);
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            debug!(path = %path.display(), "loading config");
            current = current.merge_with(&load_raw_settings(&path)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Overlay the values specified in `overlay`.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            closure: overlay.closure.unwrap_or(self.closure),
            parallel: overlay.parallel.unwrap_or(self.parallel),
            sort: overlay.sort.clone().unwrap_or_else(|| self.sort.clone()),
            output: overlay.output.unwrap_or(self.output),
            node_symbol: overlay
                .node_symbol
                .clone()
                .unwrap_or_else(|| self.node_symbol.clone()),
        }
    }

    /// Apply HIERTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("HIERTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("sort"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_bool("closure") {
            settings.closure = val;
        }
        if let Ok(val) = config.get_int("parallel") {
            settings.parallel = usize::try_from(val)
                .map_err(|_| ApplicationError::InvalidParallelism(val.to_string()))?;
        }
        if let Ok(val) = config.get::<Vec<String>>("sort") {
            settings.sort = val;
        }
        if let Ok(val) = config.get_string("output") {
            settings.output = val.parse()?;
        }
        if let Ok(val) = config.get_string("node_symbol") {
            settings.node_symbol = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# hiertree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/hiertree/hiertree.toml
#   Explicit: --config <file>
#   Env:      HIERTREE_* environment variables (e.g. HIERTREE_SORT=name,-size)
#   Flags:    command line options

# Explore everything reachable from the given roots
# closure = false

# Worker threads used for exploration (0 = sequential)
# parallel = 0

# Sort fields, prefix with "-" for descending order
# sort = ["name"]

# Output mode: table, wide, tree, json, yaml
# output = "table"

# Symbol tagging tree rows followed by their children ("" disables it)
# node_symbol = "⊗"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_unreadable_config_when_loading_raw_then_error_names_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_raw_settings(dir.path()).unwrap_err();
        assert!(matches!(err, ApplicationError::OperationFailed { .. }));
        assert!(err.to_string().contains("read config"));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn given_defaults_when_created_then_sequential_table_output() {
        let settings = Settings::default();
        assert!(!settings.closure);
        assert_eq!(settings.parallel, 0);
        assert_eq!(settings.output, OutputMode::Table);
        assert_eq!(settings.node_symbol, "⊗");
    }

    #[test]
    fn given_overlay_when_merging_then_only_specified_values_change() {
        let overlay = RawSettings {
            output: Some(OutputMode::Tree),
            sort: Some(vec!["-size".into()]),
            ..RawSettings::default()
        };
        let merged = Settings::default().merge_with(&overlay);
        assert_eq!(merged.output, OutputMode::Tree);
        assert_eq!(merged.sort, ["-size"]);
        assert_eq!(merged.node_symbol, "⊗");
    }

    #[test]
    fn given_template_when_parsed_then_yields_defaults() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("parse template");
        assert_eq!(Settings::default().merge_with(&raw), Settings::default());
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips() {
        let settings = Settings {
            closure: true,
            output: OutputMode::Yaml,
            ..Settings::default()
        };
        let text = settings.to_toml().unwrap();
        assert!(text.contains("output = \"yaml\""));
        let raw: RawSettings = toml::from_str(&text).unwrap();
        assert_eq!(Settings::default().merge_with(&raw), settings);
    }
}
