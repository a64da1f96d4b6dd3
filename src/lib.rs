//! hiertree: explore hierarchies and render them as tables, trees or manifests
//!
//! The crate is layered like this:
//! - [`domain`]: hierarchy model, closure engine, hierarchy comparator, tree synthesis
//! - [`application`]: sort criteria, output rendering, the processing pipeline
//! - [`infrastructure`]: backends (filesystem, in-memory graph)
//! - [`cli`]: argument parsing and command dispatch
//!
//! ```no_run
//! use hiertree::application::{OutputMode, Pipeline};
//! use hiertree::config::Settings;
//! use hiertree::infrastructure::{Graph, GraphSource};
//!
//! let graph = Graph::demo().unwrap();
//! let settings = Settings { closure: true, output: OutputMode::Tree, ..Settings::default() };
//! let pipeline = Pipeline::new(settings).unwrap();
//! let n = pipeline
//!     .process(&["c".to_string()], &GraphSource::new(&graph), &mut std::io::stdout())
//!     .unwrap();
//! println!("processed {n} nodes");
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
