//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use clap_complete::Shell;

/// Explore hierarchies (files, graphs) and render them as tables, trees or manifests
#[derive(Parser, Debug)]
#[command(name = "hiertree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more detail (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Config file (default: ~/.config/hiertree/hiertree.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Explore everything reachable from the given roots
    #[arg(short, long, global = true)]
    pub closure: bool,

    /// Worker threads for exploration (0 = sequential)
    #[arg(short, long, global = true, value_name = "N")]
    pub parallel: Option<usize>,

    /// Sort fields, comma separated, "-" prefix for descending order
    #[arg(
        short,
        long,
        global = true,
        value_name = "FIELD",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub sort: Vec<String>,

    /// Output mode: table, wide, tree, json, yaml
    #[arg(short, long, global = true, value_name = "MODE")]
    pub output: Option<String>,

    /// Print shell completion script
    #[arg(long = "generator", value_enum)]
    pub generator: Option<Shell>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List files; directories are listed one level, or fully with --closure
    Files {
        /// Show directory arguments themselves instead of their content
        #[arg(short = 'D', long)]
        directory: bool,

        /// Files or directories
        #[arg(value_hint = ValueHint::AnyPath, default_value = ".")]
        paths: Vec<String>,
    },

    /// Explore the built-in sample graph
    Graph {
        /// Root node names (default: all roots)
        roots: Vec<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
    /// Show the global config file location
    Path,
}
